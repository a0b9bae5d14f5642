//! Load family: the 1/5/15-minute load averages of the web server host.

use crate::collectors::command::{run_capture, CommandTemplate};
use crate::collectors::{Collector, Family};
use crate::error::CollectError;
use crate::reading::{Batch, LoadSample};

/// Parse the first line of `w` output.
///
/// Commas become spaces and the last three tokens are the load averages.
pub fn parse_load_line(output: &str, t: i64) -> Result<LoadSample, CollectError> {
    let line = output
        .lines()
        .next()
        .ok_or_else(|| CollectError::Parse("load command printed nothing".into()))?;
    let cleaned = line.replace(',', " ");
    let tokens: Vec<&str> = cleaned.split_whitespace().collect();
    if tokens.len() < 3 {
        return Err(CollectError::Parse(format!(
            "expected three load averages in '{}'",
            line.trim()
        )));
    }

    let mut values = [0.0_f64; 3];
    for (slot, token) in values.iter_mut().zip(&tokens[tokens.len() - 3..]) {
        *slot = token.parse().map_err(|_| {
            CollectError::Parse(format!("'{}' is not a load average in '{}'", token, line.trim()))
        })?;
    }

    Ok(LoadSample {
        t,
        one_minute: values[0],
        five_minutes: values[1],
        fifteen_minutes: values[2],
    })
}

/// Collector running the load command once per cycle.
#[derive(Debug, Clone)]
pub struct LoadCollector {
    command: CommandTemplate,
}

impl LoadCollector {
    pub fn new(command: CommandTemplate) -> Self {
        Self { command }
    }
}

impl Collector for LoadCollector {
    fn family(&self) -> Family {
        Family::Load
    }

    async fn collect(&mut self) -> Result<Batch, CollectError> {
        let output = run_capture(self.command.program(), self.command.args()).await?;
        let t = chrono::Utc::now().timestamp();
        Ok(Batch::Load(parse_load_line(&output, t)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_w_header() {
        let out = " 10:02:11 up 12 days,  3:04,  2 users,  load average: 0.52, 0.58, 0.59\n\
                   USER     TTY      FROM             LOGIN@   IDLE   JCPU   PCPU WHAT\n";
        let sample = parse_load_line(out, 7).unwrap();
        assert_eq!(sample.t, 7);
        assert_eq!(sample.one_minute, 0.52);
        assert_eq!(sample.five_minutes, 0.58);
        assert_eq!(sample.fifteen_minutes, 0.59);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse_load_line("", 0).is_err());
        assert!(parse_load_line("load average: high", 0).is_err());
        assert!(matches!(
            parse_load_line("up 3 days, load average: a, b, c", 0),
            Err(CollectError::Parse(_))
        ));
    }
}
