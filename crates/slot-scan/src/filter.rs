use crate::cowin_client::{Appointments, Center, Session};
use crate::scan_types::{Dose, SearchCriteria};

/// A session that satisfied the criteria, together with the center offering it
#[derive(Debug, Clone, Copy)]
pub struct SessionMatch<'a> {
    /// Center the session belongs to
    pub center: &'a Center,
    /// The matching session
    pub session: &'a Session,
}

/// Every matching (center, session) pair in API order
pub fn find_matches<'a>(
    appointments: &'a Appointments,
    criteria: &SearchCriteria,
) -> Vec<SessionMatch<'a>> {
    let mut matches = Vec::new();

    for center in &appointments.centers {
        // Fee type is a center attribute, so a mismatch drops all of its sessions
        if !center_accepted(center, criteria) {
            continue;
        }

        matches.extend(
            center
                .sessions
                .iter()
                .filter(|session| session_accepted(session, criteria))
                .map(|session| SessionMatch { center, session }),
        );
    }

    matches
}

/// Full predicate for one session in the context of its center
pub fn is_available(center: &Center, session: &Session, criteria: &SearchCriteria) -> bool {
    center_accepted(center, criteria) && session_accepted(session, criteria)
}

/// Center-level check: fee preference
pub fn center_accepted(center: &Center, criteria: &SearchCriteria) -> bool {
    is_preferred(&center.fee_type, criteria.fee.map(|f| f.as_str()))
}

/// Session-level checks: age, dose capacity and vaccine preference
pub fn session_accepted(session: &Session, criteria: &SearchCriteria) -> bool {
    session.min_age_limit <= criteria.age
        && dose_capacity(session, criteria.dose) >= criteria.quantity
        && is_preferred(&session.vaccine, criteria.vaccine.map(|v| v.as_str()))
}

fn dose_capacity(session: &Session, dose: Dose) -> u32 {
    match dose {
        Dose::First => session.available_capacity_dose1,
        Dose::Second => session.available_capacity_dose2,
    }
}

/// No preference accepts anything
fn is_preferred(current: &str, preference: Option<&str>) -> bool {
    match preference {
        None => true,
        Some(wanted) => current.to_lowercase() == wanted.to_lowercase(),
    }
}
