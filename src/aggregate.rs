use std::cmp::Reverse;
use std::collections::HashMap;

use rayon::prelude::*;

use crate::cost::PricingMap;
use crate::period::{bucket_key, Granularity};
use crate::types::{DetailedGroupStat, GroupSummary, HistoryRecord};

/// A plain record field usable as a grouping key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordField {
    ActionName,
    Model,
    Temperature,
}

impl RecordField {
    pub fn name(&self) -> &'static str {
        match self {
            RecordField::ActionName => "actionName",
            RecordField::Model => "model",
            RecordField::Temperature => "temperature",
        }
    }

    pub fn value(&self, r: &HistoryRecord) -> Option<String> {
        match self {
            RecordField::ActionName => r.action_name.clone(),
            RecordField::Model => r.model_id.clone(),
            RecordField::Temperature => r.temperature.map(|t| t.to_string()),
        }
    }
}

/// How records are partitioned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupKey {
    Field(RecordField),
    Period(Granularity),
}

impl GroupKey {
    /// Bucket name for records whose key is missing.
    pub fn sentinel(&self) -> String {
        match self {
            GroupKey::Field(field) => format!("undefined_{}", field.name()),
            GroupKey::Period(_) => "undefined_timestamp".to_string(),
        }
    }

    pub fn value(&self, r: &HistoryRecord) -> Option<String> {
        match self {
            GroupKey::Field(field) => field.value(r),
            GroupKey::Period(granularity) => bucket_key(r.timestamp, *granularity),
        }
    }
}

/// One partition: its key and the members in input order.
#[derive(Debug, Clone)]
pub struct Group<'a> {
    pub key: String,
    pub records: Vec<&'a HistoryRecord>,
}

/// Partition `records` by `key_fn`, keeping input order inside each group.
/// Groups come back in the order their keys were first seen; a `None` key
/// lands in the `sentinel` group.
pub fn group_by_with<'a, I, F>(records: I, sentinel: &str, key_fn: F) -> Vec<Group<'a>>
where
    I: IntoIterator<Item = &'a HistoryRecord>,
    F: Fn(&HistoryRecord) -> Option<String>,
{
    let mut groups: Vec<Group<'a>> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for r in records {
        let key = key_fn(r).unwrap_or_else(|| sentinel.to_string());
        let slot = match index.get(&key) {
            Some(&i) => i,
            None => {
                index.insert(key.clone(), groups.len());
                groups.push(Group {
                    key,
                    records: Vec::new(),
                });
                groups.len() - 1
            }
        };
        groups[slot].records.push(r);
    }

    groups
}

pub fn group_by<'a, I>(records: I, key: GroupKey) -> Vec<Group<'a>>
where
    I: IntoIterator<Item = &'a HistoryRecord>,
{
    group_by_with(records, &key.sentinel(), |r| key.value(r))
}

/// Summary statistics of one group.
///
/// Every member counts toward `member_count` and adds its cost (zero without
/// stats). Token and time sums, and the averages, only take members whose
/// stats are complete.
pub fn summarize(group: &[&HistoryRecord], pricing: &dyn PricingMap) -> GroupSummary {
    let mut summary = GroupSummary {
        member_count: group.len(),
        ..Default::default()
    };

    for r in group {
        summary.total_cost += pricing.cost_for_record(r);

        if let Some(stats) = r.stats.as_ref().filter(|s| s.is_complete()) {
            summary.total_tokens = summary.total_tokens.saturating_add(stats.total_reported());
            summary.total_elapsed_secs += stats.total_elapsed_secs.unwrap_or(0.0);
            summary.complete_count += 1;
        }
    }

    summary.refresh_averages();
    summary
}

/// Group by `field`, summarize each group in parallel, label it with
/// `resolve_name` and sort by member count, largest first.
///
/// The sort is stable: equal counts keep the order in which their keys first
/// appeared in `records`.
pub fn detailed_group_stats<'a, I, F>(
    records: I,
    field: RecordField,
    resolve_name: F,
    pricing: &dyn PricingMap,
) -> Vec<DetailedGroupStat>
where
    I: IntoIterator<Item = &'a HistoryRecord>,
    F: Fn(&str) -> String + Sync,
{
    let groups = group_by(records, GroupKey::Field(field));
    tracing::debug!(field = field.name(), groups = groups.len(), "grouped history");

    let mut stats: Vec<DetailedGroupStat> = groups
        .par_iter()
        .filter(|g| !g.records.is_empty())
        .map(|g| DetailedGroupStat {
            key: g.key.clone(),
            label: resolve_name(&g.key),
            summary: summarize(&g.records, pricing),
        })
        .collect();

    stats.sort_by_key(|s| Reverse(s.summary.member_count));
    stats
}

/// Period buckets in chronological key order, each summarized.
pub fn period_summaries<'a, I>(
    records: I,
    granularity: Granularity,
    pricing: &dyn PricingMap,
) -> Vec<(Group<'a>, GroupSummary)>
where
    I: IntoIterator<Item = &'a HistoryRecord>,
{
    let mut groups = group_by(records, GroupKey::Period(granularity));
    groups.sort_by(|a, b| a.key.cmp(&b.key));

    let summaries: Vec<GroupSummary> = groups
        .par_iter()
        .map(|g| summarize(&g.records, pricing))
        .collect();

    groups.into_iter().zip(summaries).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cost::Pricing;
    use crate::types::RequestStats;

    fn complete(total: u64, secs: f64) -> RequestStats {
        RequestStats {
            prompt_tokens: Some(total / 2),
            reasoning_tokens: Some(0),
            total_tokens: Some(total),
            total_elapsed_secs: Some(secs),
            first_response_secs: Some(secs / 2.0),
            ..Default::default()
        }
    }

    fn rec(
        action: Option<&str>,
        model: &str,
        ts: i64,
        stats: Option<RequestStats>,
    ) -> HistoryRecord {
        HistoryRecord {
            action_name: action.map(str::to_string),
            model_id: Some(model.to_string()),
            temperature: Some(0.2),
            stats,
            timestamp: ts,
        }
    }

    #[test]
    fn group_by_is_a_stable_partition() {
        let records = vec![
            rec(Some("ask"), "gemini-2.5-flash", 1, None),
            rec(Some("chat"), "gemini-2.5-flash", 2, None),
            rec(Some("ask"), "o4-mini", 3, None),
            rec(None, "o4-mini", 4, None),
            rec(Some("ask"), "o4-mini", 5, None),
        ];
        let groups = group_by(&records, GroupKey::Field(RecordField::ActionName));
        let keys: Vec<&str> = groups.iter().map(|g| g.key.as_str()).collect();
        assert_eq!(keys, vec!["ask", "chat", "undefined_actionName"]);

        let ask: Vec<i64> = groups[0].records.iter().map(|r| r.timestamp).collect();
        assert_eq!(ask, vec![1, 3, 5]);

        let total: usize = groups.iter().map(|g| g.records.len()).sum();
        assert_eq!(total, records.len());
    }

    #[test]
    fn sentinel_does_not_merge_with_real_names() {
        let records = vec![
            rec(Some("undefined"), "gemini-2.5-flash", 1, None),
            rec(None, "gemini-2.5-flash", 2, None),
        ];
        let groups = group_by(&records, GroupKey::Field(RecordField::ActionName));
        assert_eq!(groups.len(), 2);
    }

    #[test]
    fn group_by_temperature_and_period() {
        let mut records = vec![
            rec(Some("ask"), "gemini-2.5-flash", 0, None),
            rec(Some("ask"), "gemini-2.5-flash", 86_400_000 * 400, None),
        ];
        records[1].temperature = None;
        let groups = group_by(&records, GroupKey::Field(RecordField::Temperature));
        assert_eq!(groups[0].key, "0.2");
        assert_eq!(groups[1].key, "undefined_temperature");

        let groups = group_by(&records, GroupKey::Period(Granularity::Year));
        assert_eq!(groups.len(), 2);
    }

    #[test]
    fn empty_group_summary_is_all_zero() {
        let s = summarize(&[], &Pricing::default());
        assert_eq!(s.member_count, 0);
        assert_eq!(s.total_cost, 0.0);
        assert_eq!(s.total_tokens, 0);
        assert_eq!(s.average_tokens, 0.0);
        assert_eq!(s.total_elapsed_secs, 0.0);
        assert_eq!(s.average_elapsed_secs, 0.0);
        assert_eq!(s, GroupSummary::default());
    }

    #[test]
    fn incomplete_members_count_but_do_not_average() {
        let partial = RequestStats {
            prompt_tokens: Some(1_000_000),
            total_tokens: Some(1_000_000),
            ..Default::default()
        };
        let records = vec![
            rec(Some("ask"), "gemini-2.5-flash", 1, Some(complete(1000, 2.0))),
            rec(Some("ask"), "gemini-2.5-flash", 2, Some(complete(3000, 4.0))),
            rec(Some("ask"), "gemini-2.5-flash", 3, None),
            rec(Some("ask"), "gemini-2.5-flash", 4, Some(partial)),
        ];
        let members: Vec<&HistoryRecord> = records.iter().collect();
        let s = summarize(&members, &Pricing::default());

        assert_eq!(s.member_count, 4);
        assert_eq!(s.complete_count, 2);
        assert_eq!(s.total_tokens, 4000);
        assert_eq!(s.average_tokens, 2000.0);
        assert_eq!(s.total_elapsed_secs, 6.0);
        assert_eq!(s.average_elapsed_secs, 3.0);

        // The partial record is still priced: 1M prompt tokens of 2.5 Flash.
        let complete_cost = (500.0 * 0.15 + 500.0 * 0.6 + 1500.0 * 0.15 + 1500.0 * 0.6) / 1e6;
        assert!((s.total_cost - (complete_cost + 0.15)).abs() < 1e-9);
    }

    #[test]
    fn huge_token_totals_saturate() {
        let huge = RequestStats {
            total_tokens: Some(u64::MAX / 2 + 1),
            total_elapsed_secs: Some(1.0),
            ..Default::default()
        };
        let records = vec![
            rec(Some("ask"), "gemini-2.5-flash", 1, Some(huge.clone())),
            rec(Some("ask"), "gemini-2.5-flash", 2, Some(huge)),
        ];
        let members: Vec<&HistoryRecord> = records.iter().collect();
        let s = summarize(&members, &Pricing::default());
        assert_eq!(s.total_tokens, u64::MAX);
        assert_eq!(s.complete_count, 2);
        assert_eq!(s.total_elapsed_secs, 2.0);
    }

    #[test]
    fn member_counts_sum_to_input_length() {
        let records: Vec<HistoryRecord> = (0..25)
            .map(|i| {
                let model = ["gemini-2.5-pro", "o4-mini", "custom"][i % 3];
                let stats = (i % 4 != 0).then(|| complete(100 * i as u64, 1.0));
                rec(Some("ask"), model, i as i64, stats)
            })
            .collect();
        let pricing = Pricing::default();
        let summaries: usize = group_by(&records, GroupKey::Field(RecordField::Model))
            .iter()
            .map(|g| summarize(&g.records, &pricing).member_count)
            .sum();
        assert_eq!(summaries, records.len());
    }

    #[test]
    fn detailed_stats_sort_by_count_stably() {
        let mut records = Vec::new();
        for i in 0..5 {
            records.push(rec(Some("alpha"), "gemini-2.5-flash", i, None));
        }
        records.push(rec(Some("beta"), "gemini-2.5-flash", 10, None));
        for i in 0..5 {
            records.push(rec(Some("gamma"), "gemini-2.5-flash", 20 + i, None));
        }

        let stats = detailed_group_stats(
            &records,
            RecordField::ActionName,
            |key| key.to_uppercase(),
            &Pricing::default(),
        );
        let order: Vec<(&str, usize)> = stats
            .iter()
            .map(|s| (s.label.as_str(), s.summary.member_count))
            .collect();
        assert_eq!(order, vec![("ALPHA", 5), ("GAMMA", 5), ("BETA", 1)]);
        assert_eq!(stats[2].key, "beta");
    }

    #[test]
    fn detailed_stats_resolve_model_names() {
        let pricing = Pricing::default();
        let records = vec![
            rec(Some("ask"), "gemini-2.5-pro", 1, Some(complete(10, 1.0))),
            rec(Some("ask"), "local-llm", 2, Some(complete(10, 1.0))),
            rec(Some("ask"), "local-llm", 3, Some(complete(10, 1.0))),
        ];
        let stats = detailed_group_stats(
            &records,
            RecordField::Model,
            |key| pricing.table.display_name(key),
            &pricing,
        );
        assert_eq!(stats[0].label, "local-llm");
        assert_eq!(stats[1].label, "2.5 Pro");
    }

    #[test]
    fn period_summaries_are_chronological() {
        let day = 86_400_000;
        let records = vec![
            rec(Some("ask"), "o4-mini", 3 * 366 * day, None),
            rec(Some("ask"), "o4-mini", 366 * day, None),
            rec(Some("ask"), "o4-mini", 3 * 366 * day + 1, None),
        ];
        let rows = period_summaries(&records, Granularity::Year, &Pricing::default());
        assert_eq!(rows.len(), 2);
        assert!(rows[0].0.key < rows[1].0.key);
        assert_eq!(rows[1].1.member_count, 2);
    }
}
