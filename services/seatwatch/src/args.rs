//! Positional startup arguments: a term followed by one or more courses

use crate::SeatWatchError;

/// Term and courses given on the command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartupArgs {
    pub term: u32,
    pub courses: Vec<u32>,
}

/// Parse `TERM COURSE...`
///
/// Every argument must consist of ASCII digits only, and at least one course
/// must follow the term.
pub fn parse_startup_args<S: AsRef<str>>(args: &[S]) -> crate::Result<StartupArgs> {
    if args.len() < 2 {
        return Err(SeatWatchError::Usage(
            "Not enough arguments: give the course term followed by every class to monitor"
                .to_string(),
        ));
    }

    let numbers = args
        .iter()
        .map(|arg| parse_number(arg.as_ref()))
        .collect::<crate::Result<Vec<u32>>>()?;

    Ok(StartupArgs {
        term: numbers[0],
        courses: numbers[1..].to_vec(),
    })
}

fn parse_number(arg: &str) -> crate::Result<u32> {
    if arg.is_empty() || !arg.bytes().all(|b| b.is_ascii_digit()) {
        return Err(SeatWatchError::Usage(format!(
            "Argument \"{}\" is not a number",
            arg
        )));
    }
    arg.parse::<u32>()
        .map_err(|e| SeatWatchError::Usage(format!("Argument \"{}\" is out of range: {}", arg, e)))
}
