use std::time::Duration;

use chrono::NaiveDate;
use clap::{Parser, ValueEnum};
use slot_scan::{
    API_DATE_FORMAT, DEFAULT_SMTP_HOST, Dose, FeePreference, LocationQuery, ScanError,
    SearchCriteria, VaccinePreference,
};
use validator::{Validate, ValidationError};

/// Command line and environment configuration
#[derive(Debug, Parser, Validate)]
#[command(name = "vaccine-notifier")]
#[command(about = "CoWIN vaccine availability notifier India")]
#[command(
    long_about = "Polls the CoWIN public API for vaccination sessions matching your age, dose \
    and preferences, and emails you the matching centers.\n\n\
    Search either by pin code, or by state and district name. Every option can also be \
    set through the environment variable shown next to it, or in a .env file."
)]
#[validate(schema(function = "validate_cli"))]
pub struct Cli {
    /// Search by pin code
    #[arg(short = 'c', long, env = "PIN_CODE")]
    #[validate(custom(function = "validate_pincode"))]
    pub pincode: Option<String>,

    /// Search by state name (requires --district)
    #[arg(short, long, env = "STATE_NAME")]
    pub state: Option<String>,

    /// Search by district name (requires --state)
    #[arg(short, long, env = "DISTRICT_NAME")]
    pub district: Option<String>,

    /// Search appointment for age
    #[arg(short, long, env = "AGE")]
    #[validate(range(min = 1, message = "Age must be greater than 0"))]
    pub age: u32,

    /// Email address to send notifications to (and to send them from)
    #[arg(short, long, env = "EMAIL_ID")]
    #[validate(email(message = "Invalid email address"))]
    pub email: Option<String>,

    /// Password or app password of the email account
    #[arg(short, long, env = "EMAIL_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Interval to repeat the search, in seconds
    #[arg(short, long, env = "SEARCH_INTERVAL", default_value_t = 30)]
    #[validate(range(min = 1, message = "Interval must be at least 1 second"))]
    pub interval: u64,

    /// Appointment date (DD-MM-YYYY). Defaults to today.
    #[arg(short = 'D', long, env = "APPOINTMENT_DATE")]
    #[validate(custom(function = "validate_date"))]
    pub date: Option<String>,

    /// Vaccine preference. Default: no preference
    #[arg(short, long, env = "VACCINE", value_enum, ignore_case = true)]
    pub vaccine: Option<VaccineArg>,

    /// Fee preference. Default: no preference
    #[arg(short, long, env = "FEE", value_enum, ignore_case = true)]
    pub fee: Option<FeeArg>,

    /// Dose number, 1 or 2
    #[arg(short = 'o', long, env = "DOSE", default_value_t = 1)]
    #[validate(range(min = 1, max = 2, message = "Dose must be 1 or 2"))]
    pub dose: u8,

    /// Minimum number of available doses a session must offer, 1 to 5
    #[arg(short = 'm', long, env = "MIN_CAPACITY", default_value_t = 1)]
    #[validate(range(min = 1, max = 5, message = "Minimum capacity must be between 1 and 5"))]
    pub min_capacity: u32,

    /// SMTP relay used to send the notification
    #[arg(long, env = "SMTP_HOST", default_value = DEFAULT_SMTP_HOST)]
    pub smtp_host: String,

    /// Base URL of the CoWIN API
    #[arg(long, env = "COWIN_API_URL")]
    pub api_base_url: Option<String>,

    /// Log reports instead of emailing them
    #[arg(long, env = "DRY_RUN")]
    pub dry_run: bool,
}

/// Vaccine names accepted on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum VaccineArg {
    /// COVISHIELD
    Covishield,
    /// COVAXIN
    Covaxin,
}

/// Fee types accepted on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FeeArg {
    /// Free centers only
    Free,
    /// Paid centers only
    Paid,
}

/// How reports leave the process
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    /// Only log the email
    Log {
        /// Address shown in the log
        recipient: String,
    },
    /// Send through an SMTP relay, from and to `email`
    Smtp {
        /// Relay host name
        host: String,
        /// Account and recipient address
        email: String,
        /// Account password
        password: String,
    },
}

/// Validated configuration for one run
#[derive(Debug, Clone)]
pub struct Settings {
    /// Where to search
    pub location: LocationQuery,
    /// What to look for
    pub criteria: SearchCriteria,
    /// Time between polls
    pub interval: Duration,
    /// Notification channel
    pub delivery: Delivery,
    /// API override, mostly for testing
    pub api_base_url: Option<String>,
}

impl Cli {
    /// Validate every option and build the run settings. `today` is the default date.
    pub fn into_settings(mut self, today: NaiveDate) -> Result<Settings, ScanError> {
        self.clear_blank_values();
        self.validate()
            .map_err(|e| ScanError::Config(e.to_string()))?;

        let location = match (self.pincode, self.state, self.district) {
            (Some(pincode), None, None) => LocationQuery::PostalCode(pincode),
            (None, Some(state), Some(district)) => LocationQuery::District { state, district },
            _ => {
                return Err(ScanError::Config(
                    "Pass either a pin code or a state and district name".to_string(),
                ));
            }
        };

        let date = match self.date {
            Some(date) => parse_date(&date)?,
            None => today,
        };

        let criteria = SearchCriteria {
            age: self.age,
            dose: Dose::try_from(self.dose)?,
            quantity: self.min_capacity,
            vaccine: self.vaccine.map(|v| match v {
                VaccineArg::Covishield => VaccinePreference::Covishield,
                VaccineArg::Covaxin => VaccinePreference::Covaxin,
            }),
            fee: self.fee.map(|f| match f {
                FeeArg::Free => FeePreference::Free,
                FeeArg::Paid => FeePreference::Paid,
            }),
            date,
        };

        let delivery = match (self.dry_run, self.email, self.password) {
            (true, email, _) => Delivery::Log {
                recipient: email.unwrap_or_else(|| "dry-run".to_string()),
            },
            (false, Some(email), Some(password)) => Delivery::Smtp {
                host: self.smtp_host,
                email,
                password,
            },
            _ => return Err(ScanError::Config("Missing email creds".to_string())),
        };

        Ok(Settings {
            location,
            criteria,
            interval: Duration::from_secs(self.interval),
            delivery,
            api_base_url: self.api_base_url,
        })
    }
}

impl Cli {
    /// A blank option, typically `NAME=` in a .env file, counts as unset.
    fn clear_blank_values(&mut self) {
        for value in [
            &mut self.pincode,
            &mut self.state,
            &mut self.district,
            &mut self.email,
            &mut self.password,
            &mut self.date,
            &mut self.api_base_url,
        ] {
            if value.as_deref().is_some_and(|v| v.trim().is_empty()) {
                *value = None;
            }
        }
    }
}

fn parse_date(date: &str) -> Result<NaiveDate, ScanError> {
    NaiveDate::parse_from_str(date, API_DATE_FORMAT).map_err(|e| {
        ScanError::Config(format!(
            "Appointment date must be of the format DD-MM-YYYY, got {:?}: {}",
            date, e
        ))
    })
}

fn validate_date(date: &str) -> Result<(), ValidationError> {
    match NaiveDate::parse_from_str(date, API_DATE_FORMAT) {
        Ok(_) => Ok(()),
        Err(_) => Err(ValidationError::new("invalid_date")
            .with_message("Appointment date must be of the format DD-MM-YYYY".into())),
    }
}

fn validate_pincode(pincode: &str) -> Result<(), ValidationError> {
    if pincode.len() == 6 && pincode.chars().all(|c| c.is_ascii_digit()) {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_pincode").with_message("Pin code must be 6 digits".into()))
    }
}

fn validate_cli(cli: &Cli) -> Result<(), ValidationError> {
    let has_pincode = cli.pincode.is_some();
    let has_state = cli.state.is_some();
    let has_district = cli.district.is_some();

    if !has_pincode && !has_state && !has_district {
        return Err(ValidationError::new("missing_location").with_message(
            "Please pass one of the pin code or state & district name combination options".into(),
        ));
    }
    if has_pincode && (has_state || has_district) {
        return Err(ValidationError::new("ambiguous_location")
            .with_message("Pass either a pin code or a state and district name, not both".into()));
    }
    if !has_pincode && !(has_state && has_district) {
        return Err(ValidationError::new("incomplete_location")
            .with_message("Missing state or district name option".into()));
    }
    if !cli.dry_run && (cli.email.is_none() || cli.password.is_none()) {
        return Err(ValidationError::new("missing_credentials")
            .with_message("Missing email creds".into()));
    }
    Ok(())
}
