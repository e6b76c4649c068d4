use almanac_core::config::load_config;
use almanac_rfc::rfc::ical::core::{DateOrDateTime, RRule, RecurringComponent};
use almanac_service::recurrence::RecurrenceService;
use almanac_service::telemetry::{apply_log_level, init_tracing};

/// Prints the first instances of a rule.
///
/// Usage: `expand_rule <DTSTART> <RRULE> [LIMIT]`, where DTSTART is a DATE,
/// a DATE-TIME, or `TZID=<zone>:<DATE-TIME>`.
fn main() -> anyhow::Result<()> {
    let filter_handle = init_tracing()?;
    let config = load_config()?;
    apply_log_level(&filter_handle, &config.logging.level);

    let mut args = std::env::args().skip(1);
    let (Some(dtstart), Some(rule)) = (args.next(), args.next()) else {
        eprintln!("Usage: expand_rule <DTSTART> <RRULE> [LIMIT]");
        std::process::exit(2);
    };
    let limit = args.next().map_or(Ok(10), |limit| limit.parse::<usize>())?;

    let (tzid, value) = match dtstart
        .strip_prefix("TZID=")
        .and_then(|rest| rest.split_once(':'))
    {
        Some((tzid, value)) => (Some(tzid), value),
        None => (None, dtstart.as_str()),
    };
    let event = RecurringComponent::event(DateOrDateTime::parse(value, tzid)?)
        .with_rrule(rule.parse::<RRule>()?);

    let service = RecurrenceService::new(&config)?;
    for instance in service.expand_limited(&event, None, None, limit)? {
        println!("{} {}", instance.start.to_rfc3339(), instance.end.to_rfc3339());
    }

    Ok(())
}
