use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use ts_core::{Field, Granularity};

use crate::controller::SelectionError;

/// Text shown in the chart's title and axis-label regions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChartLabels {
    pub title: String,
    pub axis: String,
}

/// Labels keyed by `(field, granularity)`.
#[derive(Debug, Clone)]
pub struct LabelTable {
    entries: HashMap<(Field, Granularity), ChartLabels>,
}

impl LabelTable {
    /// The stock table: one entry for each of the 30 combinations.
    pub fn standard() -> Self {
        let mut entries = HashMap::with_capacity(Field::ALL.len() * Granularity::ALL.len());
        for field in Field::ALL {
            for granularity in Granularity::ALL {
                entries.insert((field, granularity), standard_labels(field, granularity));
            }
        }
        Self { entries }
    }

    /// Build a table from explicit entries and reject it unless every
    /// combination is covered.
    pub fn from_entries(
        entries: impl IntoIterator<Item = ((Field, Granularity), ChartLabels)>,
    ) -> Result<Self, SelectionError> {
        let table = Self {
            entries: entries.into_iter().collect(),
        };
        table.validate()?;
        Ok(table)
    }

    pub fn validate(&self) -> Result<(), SelectionError> {
        for field in Field::ALL {
            for granularity in Granularity::ALL {
                if !self.entries.contains_key(&(field, granularity)) {
                    return Err(SelectionError::MissingLabel { field, granularity });
                }
            }
        }
        Ok(())
    }

    /// Missing combinations degrade to empty labels.
    pub fn lookup(&self, field: Field, granularity: Granularity) -> ChartLabels {
        self.entries
            .get(&(field, granularity))
            .cloned()
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for LabelTable {
    fn default() -> Self {
        Self::standard()
    }
}

fn standard_labels(field: Field, granularity: Granularity) -> ChartLabels {
    let period = match granularity {
        Granularity::Intraday => "5 Minute Intervals",
        Granularity::Daily => "Daily",
        Granularity::Weekly => "Weekly Averages",
        Granularity::Monthly => "Monthly Averages",
        Granularity::Yearly => "Yearly Averages",
    };
    let (subject, axis) = match field {
        Field::All => ("Price and Volume", "Price (USD)"),
        Field::OpenPrice => ("Open Price", "Open Price (USD)"),
        Field::HighPrice => ("High Price", "High Price (USD)"),
        Field::LowPrice => ("Low Price", "Low Price (USD)"),
        Field::ClosePrice => ("Close Price", "Close Price (USD)"),
        Field::Volume => ("Trading Volume", "Shares Traded"),
    };
    ChartLabels {
        title: format!("{subject} - {period}"),
        axis: axis.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_table_is_exhaustive() {
        let table = LabelTable::standard();
        assert_eq!(table.len(), 30);
        table.validate().unwrap();
        assert_eq!(
            table.lookup(Field::OpenPrice, Granularity::Weekly).title,
            "Open Price - Weekly Averages"
        );
        assert_eq!(table.lookup(Field::Volume, Granularity::Daily).axis, "Shares Traded");
    }

    #[test]
    fn incomplete_table_is_rejected() {
        let partial = [(
            (Field::All, Granularity::Yearly),
            ChartLabels {
                title: "t".into(),
                axis: "a".into(),
            },
        )];
        let err = LabelTable::from_entries(partial).unwrap_err();
        assert!(matches!(err, SelectionError::MissingLabel { .. }));
    }

    #[test]
    fn missing_lookup_degrades_to_empty() {
        let table = LabelTable {
            entries: HashMap::new(),
        };
        assert_eq!(
            table.lookup(Field::LowPrice, Granularity::Intraday),
            ChartLabels::default()
        );
    }
}
