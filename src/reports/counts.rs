use std::collections::HashMap;

use serde::Serialize;

use super::FormRecord;
use crate::forms::FormDefinition;

/// Number of records stored against one catalog form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormCount {
    pub form_id: String,
    pub title: String,
    pub count: u64,
}

/// Per-form record counts in catalog order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FormCounts {
    forms: Vec<FormCount>,
    unmatched: u64,
}

impl FormCounts {
    /// Count for one form; `None` if the form is not in the catalog.
    pub fn get(&self, form_id: &str) -> Option<u64> {
        self.forms
            .iter()
            .find(|c| c.form_id == form_id)
            .map(|c| c.count)
    }

    /// Counts in catalog order, including zeros.
    pub fn forms(&self) -> &[FormCount] {
        &self.forms
    }

    /// Records whose foreign key matches no catalog form.
    pub fn unmatched(&self) -> u64 {
        self.unmatched
    }

    /// All records, matched or not.
    pub fn total(&self) -> u64 {
        self.forms.iter().map(|c| c.count).sum::<u64>() + self.unmatched
    }
}

/// Count records per catalog form.
pub fn count_by_form<R: FormRecord>(records: &[R], definitions: &[FormDefinition]) -> FormCounts {
    let mut tally: HashMap<&str, u64> = HashMap::new();
    for record in records {
        *tally.entry(record.form_id()).or_default() += 1;
    }

    let forms: Vec<FormCount> = definitions
        .iter()
        .map(|def| FormCount {
            form_id: def.id.clone(),
            title: def.title.clone(),
            count: tally.remove(def.id.as_str()).unwrap_or(0),
        })
        .collect();

    FormCounts {
        forms,
        unmatched: tally.values().sum(),
    }
}

/// One bar of the analytics chart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChartPoint {
    pub label: String,
    pub value: u64,
}

/// Chart input: one `(title, count)` point per catalog form.
pub fn chart_series(counts: &FormCounts) -> Vec<ChartPoint> {
    counts
        .forms()
        .iter()
        .map(|c| ChartPoint {
            label: c.title.clone(),
            value: c.count,
        })
        .collect()
}
