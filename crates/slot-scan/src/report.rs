use crate::filter::SessionMatch;

/// Printed after every match block
pub const SEPARATOR: &str = "-----------------------------";

const INDENT: usize = 4;

/// Matching sessions of one poll cycle, in the order the API returned them
#[derive(Debug, Default)]
pub struct MatchReport<'a> {
    matches: Vec<SessionMatch<'a>>,
}

struct Row {
    depth: usize,
    label: String,
    value: String,
}

impl Row {
    fn new(depth: usize, label: &str, value: impl ToString) -> Self {
        Self {
            depth,
            label: label.to_string(),
            value: value.to_string(),
        }
    }

    fn heading(depth: usize, label: &str) -> Self {
        Self::new(depth, label, "")
    }
}

impl<'a> MatchReport<'a> {
    /// Wrap filter output
    pub fn new(matches: Vec<SessionMatch<'a>>) -> Self {
        Self { matches }
    }

    /// True when nothing matched; such a report is never sent
    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }

    /// Number of matching sessions
    pub fn len(&self) -> usize {
        self.matches.len()
    }

    /// Render one aligned block per match. An empty report renders as an empty string.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for m in &self.matches {
            write_block(&mut out, &block_rows(m));
            out.push_str(SEPARATOR);
            out.push('\n');
        }
        out
    }
}

fn block_rows(m: &SessionMatch<'_>) -> Vec<Row> {
    let center = m.center;
    let session = m.session;

    let mut rows = vec![
        Row::new(0, "Center", &center.name),
        Row::new(0, "CenterID", center.center_id),
        Row::new(0, "State", &center.state_name),
        Row::new(0, "District", &center.district_name),
    ];
    if !center.block_name.is_empty() {
        rows.push(Row::new(0, "Block", &center.block_name));
    }
    rows.push(Row::new(0, "PinCode", center.pincode));
    rows.push(Row::new(0, "Location", format!("{}, {}", center.lat, center.long)));
    if !center.from.is_empty() || !center.to.is_empty() {
        rows.push(Row::new(0, "Hours", format!("{} - {}", center.from, center.to)));
    }
    rows.push(Row::new(0, "Fee", &center.fee_type));

    if !center.vaccine_fees.is_empty() {
        rows.push(Row::heading(0, "Vaccine"));
        for fee in &center.vaccine_fees {
            rows.push(Row::new(1, "Name", &fee.vaccine));
            rows.push(Row::new(1, "Fees", &fee.fee));
        }
    }

    rows.push(Row::heading(0, "Sessions"));
    rows.push(Row::new(1, "Date", &session.date));
    rows.push(Row::new(1, "AvailableCapacity", session.available_capacity));
    rows.push(Row::new(1, "AvailableCapacityDose1", session.available_capacity_dose1));
    rows.push(Row::new(1, "AvailableCapacityDose2", session.available_capacity_dose2));
    rows.push(Row::new(1, "MinAgeLimit", session.min_age_limit));
    rows.push(Row::new(1, "Vaccine", &session.vaccine));
    rows.push(Row::heading(1, "Slots"));
    for slot in &session.slots {
        rows.push(Row::heading(2, slot));
    }

    rows
}

/// Values start in the same column for every row of the block
fn write_block(out: &mut String, rows: &[Row]) {
    let width = rows
        .iter()
        .filter(|r| !r.value.is_empty())
        .map(|r| r.depth * INDENT + r.label.len())
        .max()
        .unwrap_or(0);

    for row in rows {
        let lead = row.depth * INDENT;
        if row.value.is_empty() {
            out.push_str(&format!("{:lead$}{}\n", "", row.label));
        } else {
            out.push_str(&format!(
                "{:lead$}{:<pad$}  {}\n",
                "",
                row.label,
                row.value,
                pad = width - lead
            ));
        }
    }
}
