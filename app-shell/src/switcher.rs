use ts_core::{Field, Granularity, ParseError};

/// A value that can sit on a switcher button.
pub trait Choice: Copy + PartialEq {
    fn label(&self) -> &'static str;
    fn from_label(label: &str) -> Result<Self, ParseError>;
}

impl Choice for Granularity {
    fn label(&self) -> &'static str {
        Granularity::label(self)
    }

    fn from_label(label: &str) -> Result<Self, ParseError> {
        Granularity::from_label(label)
    }
}

impl Choice for Field {
    fn label(&self) -> &'static str {
        Field::label(self)
    }

    fn from_label(label: &str) -> Result<Self, ParseError> {
        Field::from_label(label)
    }
}

/// Flat list of mutually exclusive options with one active item.
#[derive(Debug, Clone)]
pub struct Switcher<T: Choice> {
    items: Vec<T>,
    active: T,
}

impl<T: Choice> Switcher<T> {
    pub fn new(items: Vec<T>, active: T) -> Self {
        Self { items, active }
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn active(&self) -> T {
        self.active
    }

    pub fn is_active(&self, item: T) -> bool {
        self.active == item
    }

    /// Returns the newly active item, or `None` when `item` was already
    /// active or is not one of this switcher's options.
    pub fn click(&mut self, item: T) -> Option<T> {
        if item == self.active || !self.items.contains(&item) {
            return None;
        }
        self.active = item;
        Some(item)
    }

    /// Same as [`Switcher::click`] for a button's display text.
    pub fn click_label(&mut self, label: &str) -> Result<Option<T>, ParseError> {
        let item = T::from_label(label)?;
        Ok(self.click(item))
    }

    /// `(label, active)` per button, in display order.
    pub fn buttons(&self) -> impl Iterator<Item = (&'static str, bool)> + '_ {
        self.items.iter().map(|i| (i.label(), *i == self.active))
    }
}

impl Switcher<Granularity> {
    pub fn intervals(active: Granularity) -> Self {
        Self::new(Granularity::ALL.to_vec(), active)
    }
}

impl Switcher<Field> {
    pub fn fields(active: Field) -> Self {
        Self::new(Field::ALL.to_vec(), active)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeat_click_is_ignored() {
        let mut sw = Switcher::intervals(Granularity::Yearly);
        assert_eq!(sw.click(Granularity::Yearly), None);
        assert_eq!(sw.click(Granularity::Daily), Some(Granularity::Daily));
        assert_eq!(sw.click(Granularity::Daily), None);
        assert!(sw.is_active(Granularity::Daily));
    }

    #[test]
    fn labels_drive_clicks() {
        let mut sw = Switcher::fields(Field::All);
        assert_eq!(sw.click_label("Stock Volume").unwrap(), Some(Field::Volume));
        assert!(sw.click_label("Dividends").is_err());
        assert_eq!(sw.active(), Field::Volume);

        let active: Vec<_> = sw.buttons().filter(|(_, on)| *on).map(|(l, _)| l).collect();
        assert_eq!(active, vec!["Stock Volume"]);
        assert_eq!(sw.buttons().count(), 6);
    }

    #[test]
    fn unknown_item_is_ignored() {
        let mut sw = Switcher::new(vec![Field::All, Field::Volume], Field::All);
        assert_eq!(sw.click(Field::OpenPrice), None);
        assert_eq!(sw.active(), Field::All);
    }
}
