use std::collections::BTreeMap;

use crate::model::entity::Category;

/// Headcount per gender category.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryCounter(BTreeMap<Category, usize>);

impl CategoryCounter {
    pub fn get(&self, category: &str) -> usize {
        self.0.get(category).copied().unwrap_or(0)
    }
}

impl<C: Into<Category>> FromIterator<C> for CategoryCounter {
    fn from_iter<I: IntoIterator<Item = C>>(iter: I) -> Self {
        let mut counter = BTreeMap::new();
        for category in iter {
            *counter.entry(category.into()).or_insert(0) += 1;
        }
        CategoryCounter(counter)
    }
}
