//! Classifies item and delta names for aggregation.

use std::collections::HashMap;

use crate::{
    config::Vocabulary,
    model::{BelongsToCategory, Model, NamedEntity},
};

/// Resolves the category `name` aggregates under, memoizing in `cache`.
///
/// Single names map to their declared category. Composite names
/// (`growth/savings`, `Transfer/ISA`) map word by word, keeping growth and
/// revalue markers as they are. Names with no declared category map to
/// themselves.
pub fn get_category(
    name: &str,
    cache: &mut HashMap<String, String>,
    model: &Model,
    vocabulary: &Vocabulary,
) -> String {
    if let Some(hit) = cache.get(name) {
        return hit.clone();
    }
    let category = resolve(name, model, vocabulary);
    cache.insert(name.to_string(), category.clone());
    category
}

fn resolve(name: &str, model: &Model, vocabulary: &Vocabulary) -> String {
    let words: Vec<&str> = name
        .split(vocabulary.separator.as_str())
        .filter(|word| !word.is_empty())
        .collect();
    let Some(first) = words.first().copied() else {
        return String::new();
    };
    if let Some(category) = source_label_category(name, model, vocabulary) {
        return category;
    }

    let first_category = word_category(first, model);
    if words.len() == 1 {
        return if first_category != first {
            first_category
        } else {
            name.to_string()
        };
    }

    let second = words[1];
    let second_category = word_category(second, model);
    let is_marker = first == vocabulary.growth_marker || first == vocabulary.revalue_marker;
    if is_marker && second_category != second {
        return vocabulary.compose(first, &second_category);
    }
    if words.len() == 2 {
        return vocabulary.compose(&first_category, &second_category);
    }
    name.to_string()
}

/// Declared category of a single word, or the word itself.
fn word_category(word: &str, model: &Model) -> String {
    declared(&model.incomes, word)
        .or_else(|| declared(&model.expenses, word))
        .or_else(|| declared(&model.assets, word))
        .or_else(|| declared(&model.transactions, word))
        .unwrap_or(word)
        .to_string()
}

fn declared<'a, T>(items: &'a [T], word: &str) -> Option<&'a str>
where
    T: NamedEntity + BelongsToCategory,
{
    items
        .iter()
        .filter(|item| item.name() == word)
        .find_map(|item| item.category())
}

/// Category of a transaction whose `<name><sep><from>` label is `name`.
fn source_label_category(name: &str, model: &Model, vocabulary: &Vocabulary) -> Option<String> {
    model
        .transactions
        .iter()
        .filter(|txn| txn.has_from() && vocabulary.compose(&txn.name, txn.from.trim()) == name)
        .find_map(|txn| txn.category())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Asset, Expense, Transaction, TransactionKind};

    fn model() -> Model {
        Model::new()
            .with_expense(Expense::new("CareCosts", "1 Jan 2018", "100").with_category("Care"))
            .with_expense(
                Expense::new("LeisureExpensesRetired", "1 Jan 2018", "10").with_category("Leisure"),
            )
            .with_asset(Asset::new("savings", "1 Jan 2018", "500").with_category("Savings"))
            .with_asset(Asset::new("Cash", "1 Jan 2018", "0"))
            .with_transaction(
                Transaction::new("Sell", "1 Feb 2018", TransactionKind::Custom)
                    .from_item("savings", "10")
                    .with_category("Selling"),
            )
    }

    fn category(name: &str) -> String {
        let mut cache = HashMap::new();
        get_category(name, &mut cache, &model(), &Vocabulary::default())
    }

    #[test]
    fn single_names_use_declared_category() {
        assert_eq!(category("CareCosts"), "Care");
        assert_eq!(category("Cash"), "Cash");
        assert_eq!(category("Unknown"), "Unknown");
        assert_eq!(category(""), "");
    }

    #[test]
    fn composite_names_map_word_by_word() {
        assert_eq!(
            category("LeisureExpensesRetired/LeisureExpensesRetired"),
            "Leisure/Leisure"
        );
        assert_eq!(category("growth/savings"), "growth/Savings");
        assert_eq!(category("Cash/savings"), "Cash/Savings");
        assert_eq!(category("a/b/c"), "a/b/c");
    }

    #[test]
    fn transaction_source_label_prefers_transaction_category() {
        assert_eq!(category("Sell/savings"), "Selling");
    }

    #[test]
    fn cache_is_used_and_consistent() {
        let model = model();
        let vocabulary = Vocabulary::default();
        let mut cache = HashMap::new();
        let cold = get_category("CareCosts", &mut cache, &model, &vocabulary);
        let warm = get_category("CareCosts", &mut cache, &model, &vocabulary);
        assert_eq!(cold, warm);
        assert_eq!(cache.get("CareCosts").map(String::as_str), Some("Care"));

        cache.insert("CareCosts".into(), "Stale".into());
        assert_eq!(get_category("CareCosts", &mut cache, &model, &vocabulary), "Stale");
    }
}
