use std::env;
use std::time::Duration;

use crate::error::ConfigError;
use crate::filter::MatchRule;

const DEFAULT_POLL_INTERVAL_SECONDS: u64 = 5;
const DEFAULT_INVOCATION_TIMEOUT_SECONDS: u64 = 300;
const DEFAULT_REMEDIATION_CALL_TIMEOUT_SECONDS: u64 = 30;

/// Settings read once at startup and threaded through every component that publishes or
/// matches.
#[derive(Debug, Clone)]
pub struct Config {
    pub queue_url: String,
    pub alert_topic_arn: String,
    pub poll_interval: Duration,
    /// Bounds fetching and parsing the log file. Remediation is not covered by it.
    pub invocation_timeout: Duration,
    /// Bounds each deletion and each notification sent while remediating.
    pub remediation_call_timeout: Duration,
    pub remediation_concurrency: usize,
    pub match_rule: MatchRule,
    pub use_path_style_buckets: bool,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let queue_url = lookup("CLOUDTRAIL_QUEUE_URL")
            .filter(|v| !v.is_empty())
            .ok_or(ConfigError::Missing("CLOUDTRAIL_QUEUE_URL"))?;

        // AlertTopicArn is the name older deployments used.
        let alert_topic_arn = lookup("ALERT_TOPIC_ARN")
            .filter(|v| !v.is_empty())
            .or_else(|| lookup("AlertTopicArn").filter(|v| !v.is_empty()))
            .ok_or(ConfigError::Missing("ALERT_TOPIC_ARN"))?;

        let poll_interval = Duration::from_secs(parse_u64(
            &lookup,
            "POLL_INTERVAL_SECONDS",
            DEFAULT_POLL_INTERVAL_SECONDS,
        )?);
        let invocation_timeout = Duration::from_secs(parse_u64(
            &lookup,
            "INVOCATION_TIMEOUT_SECONDS",
            DEFAULT_INVOCATION_TIMEOUT_SECONDS,
        )?);
        let remediation_call_timeout = Duration::from_secs(parse_u64(
            &lookup,
            "REMEDIATION_CALL_TIMEOUT_SECONDS",
            DEFAULT_REMEDIATION_CALL_TIMEOUT_SECONDS,
        )?);
        let remediation_concurrency =
            parse_u64(&lookup, "REMEDIATION_CONCURRENCY", 1)?.max(1) as usize;

        let defaults = MatchRule::default();
        let match_rule = MatchRule {
            event_name: lookup("MATCH_EVENT_NAME").unwrap_or(defaults.event_name),
            parameter: lookup("MATCH_PARAMETER").unwrap_or(defaults.parameter),
            prefix: lookup("MATCH_PREFIX").unwrap_or(defaults.prefix),
        };

        let use_path_style_buckets = lookup("USE_PATH_STYLE_BUCKETS")
            .map(|v| v.to_lowercase() == "true")
            .unwrap_or(false);

        Ok(Config {
            queue_url,
            alert_topic_arn,
            poll_interval,
            invocation_timeout,
            remediation_call_timeout,
            remediation_concurrency,
            match_rule,
            use_path_style_buckets,
        })
    }
}

fn parse_u64<F>(lookup: &F, var: &'static str, default: u64) -> Result<u64, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(var) {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse::<u64>()
            .map_err(|_| ConfigError::Invalid { var, value }),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn defaults_apply_when_only_required_vars_are_set() {
        let config = Config::from_lookup(lookup_from(&[
            ("CLOUDTRAIL_QUEUE_URL", "https://sqs.local/trail"),
            ("ALERT_TOPIC_ARN", "arn:aws:sns:us-west-2:000000000000:alerts"),
        ]))
        .unwrap();

        assert_eq!(config.poll_interval, Duration::from_secs(5));
        assert_eq!(config.invocation_timeout, Duration::from_secs(300));
        assert_eq!(config.remediation_call_timeout, Duration::from_secs(30));
        assert_eq!(config.remediation_concurrency, 1);
        assert_eq!(config.match_rule.event_name, "CreateUser");
        assert_eq!(config.match_rule.parameter, "userName");
        assert_eq!(config.match_rule.prefix, "foo");
        assert!(!config.use_path_style_buckets);
    }

    #[test]
    fn legacy_topic_variable_is_accepted() {
        let config = Config::from_lookup(lookup_from(&[
            ("CLOUDTRAIL_QUEUE_URL", "https://sqs.local/trail"),
            ("AlertTopicArn", "arn:aws:sns:us-west-2:000000000000:legacy"),
        ]))
        .unwrap();
        assert_eq!(config.alert_topic_arn, "arn:aws:sns:us-west-2:000000000000:legacy");
    }

    #[test]
    fn empty_topic_variable_falls_back_to_the_legacy_name() {
        let config = Config::from_lookup(lookup_from(&[
            ("CLOUDTRAIL_QUEUE_URL", "https://sqs.local/trail"),
            ("ALERT_TOPIC_ARN", ""),
            ("AlertTopicArn", "arn:aws:sns:us-west-2:000000000000:legacy"),
        ]))
        .unwrap();
        assert_eq!(config.alert_topic_arn, "arn:aws:sns:us-west-2:000000000000:legacy");
    }

    #[test]
    fn missing_topic_is_an_error() {
        let err = Config::from_lookup(lookup_from(&[(
            "CLOUDTRAIL_QUEUE_URL",
            "https://sqs.local/trail",
        )]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Missing("ALERT_TOPIC_ARN")));
    }

    #[test]
    fn garbage_numbers_are_rejected() {
        let err = Config::from_lookup(lookup_from(&[
            ("CLOUDTRAIL_QUEUE_URL", "https://sqs.local/trail"),
            ("ALERT_TOPIC_ARN", "arn:aws:sns:us-west-2:000000000000:alerts"),
            ("INVOCATION_TIMEOUT_SECONDS", "soon"),
        ]))
        .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid { var: "INVOCATION_TIMEOUT_SECONDS", .. }
        ));
    }

    #[test]
    fn overrides_are_read() {
        let config = Config::from_lookup(lookup_from(&[
            ("CLOUDTRAIL_QUEUE_URL", "https://sqs.local/trail"),
            ("ALERT_TOPIC_ARN", "arn:aws:sns:us-west-2:000000000000:alerts"),
            ("REMEDIATION_CONCURRENCY", "0"),
            ("MATCH_PREFIX", "tmp-"),
            ("USE_PATH_STYLE_BUCKETS", "TRUE"),
        ]))
        .unwrap();
        // zero is clamped so the remediation loop always makes progress
        assert_eq!(config.remediation_concurrency, 1);
        assert_eq!(config.match_rule.prefix, "tmp-");
        assert!(config.use_path_style_buckets);
    }
}
