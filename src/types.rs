use serde::{Deserialize, Serialize};

/// Usage counters for one completed request, as reported upstream.
///
/// Every counter is optional on the wire. Providers are not always
/// consistent, so `total_tokens` may be smaller than `prompt_tokens +
/// reasoning_tokens`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RequestStats {
    #[serde(default, alias = "prompt")]
    pub prompt_tokens: Option<u64>,
    /// The user-typed part of the prompt. Display only.
    #[serde(default, alias = "input")]
    pub input_tokens: Option<u64>,
    #[serde(default, alias = "thoughts")]
    pub reasoning_tokens: Option<u64>,
    #[serde(default, alias = "total")]
    pub total_tokens: Option<u64>,
    #[serde(default, alias = "totalTime")]
    pub total_elapsed_secs: Option<f64>,
    #[serde(default, alias = "firstRespTime")]
    pub first_response_secs: Option<f64>,
}

impl RequestStats {
    pub fn prompt(&self) -> u64 {
        self.prompt_tokens.unwrap_or(0)
    }

    pub fn reasoning(&self) -> u64 {
        self.reasoning_tokens.unwrap_or(0)
    }

    pub fn total_reported(&self) -> u64 {
        self.total_tokens.unwrap_or(0)
    }

    /// Tokens of the visible answer: total − prompt − reasoning, clamped at 0.
    pub fn final_output_tokens(&self) -> u64 {
        self.total_reported()
            .saturating_sub(self.prompt())
            .saturating_sub(self.reasoning())
    }

    /// True when no counter carries a non-zero value.
    pub fn is_empty(&self) -> bool {
        self.prompt() == 0 && self.reasoning() == 0 && self.total_reported() == 0
    }

    /// Both the reported total and the elapsed time are present.
    pub fn is_complete(&self) -> bool {
        self.total_tokens.is_some() && self.total_elapsed_secs.is_some()
    }
}

/// One user interaction with the palette.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    #[serde(default, alias = "actionName")]
    pub action_name: Option<String>,
    #[serde(default, alias = "model")]
    pub model_id: Option<String>,
    #[serde(default)]
    pub temperature: Option<f64>,
    #[serde(default, alias = "requestStats")]
    pub stats: Option<RequestStats>,
    /// Creation time, epoch milliseconds.
    pub timestamp: i64,
}

/// Statistics of one group of history records. Computed on demand.
///
/// Token and time sums and their averages only cover members whose stats are
/// complete; `complete_count` is that denominator.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GroupSummary {
    pub member_count: usize,
    pub complete_count: usize,
    pub total_cost: f64,
    pub total_tokens: u64,
    pub average_tokens: f64,
    pub total_elapsed_secs: f64,
    pub average_elapsed_secs: f64,
}

impl GroupSummary {
    /// Fold another summary into this one, recomputing the averages.
    pub fn accumulate_from(&mut self, other: &GroupSummary) {
        self.member_count += other.member_count;
        self.complete_count += other.complete_count;
        self.total_cost += other.total_cost;
        self.total_tokens = self.total_tokens.saturating_add(other.total_tokens);
        self.total_elapsed_secs += other.total_elapsed_secs;
        self.refresh_averages();
    }

    pub(crate) fn refresh_averages(&mut self) {
        if self.complete_count > 0 {
            let n = self.complete_count as f64;
            self.average_tokens = self.total_tokens as f64 / n;
            self.average_elapsed_secs = self.total_elapsed_secs / n;
        } else {
            self.average_tokens = 0.0;
            self.average_elapsed_secs = 0.0;
        }
    }
}

/// A [`GroupSummary`] together with its raw group key and display label.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetailedGroupStat {
    pub key: String,
    pub label: String,
    #[serde(flatten)]
    pub summary: GroupSummary,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn final_output_is_clamped() {
        let stats = RequestStats {
            prompt_tokens: Some(800),
            reasoning_tokens: Some(400),
            total_tokens: Some(1000),
            ..Default::default()
        };
        assert_eq!(stats.final_output_tokens(), 0);

        let stats = RequestStats {
            prompt_tokens: Some(100),
            reasoning_tokens: Some(50),
            total_tokens: Some(400),
            ..Default::default()
        };
        assert_eq!(stats.final_output_tokens(), 250);
    }

    #[test]
    fn completeness_needs_total_and_time() {
        let mut stats = RequestStats {
            total_tokens: Some(10),
            ..Default::default()
        };
        assert!(!stats.is_complete());
        stats.total_elapsed_secs = Some(1.5);
        assert!(stats.is_complete());
    }

    #[test]
    fn deserializes_camel_case_history() {
        let json = r#"{
            "actionName": "ask",
            "model": "gemini-2.5-pro",
            "temperature": 0.2,
            "timestamp": 1735689600000,
            "requestStats": {
                "prompt": 10, "input": 4, "thoughts": 2, "total": 30,
                "totalTime": 1.2, "firstRespTime": 0.4
            }
        }"#;
        let r: HistoryRecord = serde_json::from_str(json).unwrap();
        assert_eq!(r.action_name.as_deref(), Some("ask"));
        assert_eq!(r.model_id.as_deref(), Some("gemini-2.5-pro"));
        let stats = r.stats.unwrap();
        assert_eq!(stats.reasoning(), 2);
        assert_eq!(stats.final_output_tokens(), 18);
        assert_eq!(stats.first_response_secs, Some(0.4));
    }

    #[test]
    fn accumulate_from_reweights_averages() {
        let mut a = GroupSummary {
            member_count: 2,
            complete_count: 2,
            total_cost: 1.0,
            total_tokens: 100,
            average_tokens: 50.0,
            total_elapsed_secs: 4.0,
            average_elapsed_secs: 2.0,
        };
        let b = GroupSummary {
            member_count: 3,
            complete_count: 1,
            total_cost: 0.5,
            total_tokens: 200,
            average_tokens: 200.0,
            total_elapsed_secs: 2.0,
            average_elapsed_secs: 2.0,
        };
        a.accumulate_from(&b);
        assert_eq!(a.member_count, 5);
        assert_eq!(a.total_tokens, 300);
        assert_eq!(a.complete_count, 3);
        assert_eq!(a.average_tokens, 100.0);
        assert_eq!(a.average_elapsed_secs, 2.0);
    }

    #[test]
    fn accumulate_from_saturates_token_total() {
        let big = GroupSummary {
            member_count: 1,
            complete_count: 1,
            total_tokens: u64::MAX / 2 + 1,
            ..Default::default()
        };
        let mut sum = big.clone();
        sum.accumulate_from(&big);
        assert_eq!(sum.total_tokens, u64::MAX);
        assert_eq!(sum.member_count, 2);
    }
}
