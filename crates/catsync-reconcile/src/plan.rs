//! Diffing desired entry models against the remote set.

use std::collections::{HashMap, HashSet};

use catsync_catalog::{BoundValue, CatalogEntry};
use catsync_output::EntryModel;

/// An update of an existing remote entry.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedUpdate {
    /// Server-assigned id of the entry being updated.
    pub id: String,
    pub model: EntryModel,
}

/// The minimum set of operations converging the remote set to the desired
/// set. Within each phase, operations are sorted by external id so
/// identical runs are identical.
#[derive(Debug, Default)]
pub struct EntriesPlan {
    pub to_delete: Vec<CatalogEntry>,
    pub to_create: Vec<EntryModel>,
    pub to_update: Vec<PlannedUpdate>,
    pub unchanged: usize,
}

impl EntriesPlan {
    /// Total number of operations the plan will issue.
    pub fn operations(&self) -> usize {
        self.to_delete.len() + self.to_create.len() + self.to_update.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations() == 0
    }
}

/// Classify each desired model against the remote index and collect the
/// delete set. `existing` must already be filtered to entries managed by
/// this sync id.
pub fn plan_entries(desired: &[EntryModel], existing: &[CatalogEntry]) -> EntriesPlan {
    let index: HashMap<&str, &CatalogEntry> = existing
        .iter()
        .map(|entry| (entry.external_id.as_str(), entry))
        .collect();
    let desired_ids: HashSet<&str> = desired
        .iter()
        .map(|model| model.external_id.as_str())
        .collect();

    let mut plan = EntriesPlan::default();
    for model in desired {
        match index.get(model.external_id.as_str()) {
            None => plan.to_create.push(model.clone()),
            Some(entry) if differs(model, entry) => plan.to_update.push(PlannedUpdate {
                id: entry.id.clone(),
                model: model.clone(),
            }),
            Some(_) => plan.unchanged += 1,
        }
    }

    plan.to_delete = existing
        .iter()
        .filter(|entry| !desired_ids.contains(entry.external_id.as_str()))
        .cloned()
        .collect();

    plan.to_delete.sort_by(|a, b| a.external_id.cmp(&b.external_id));
    plan.to_create.sort_by(|a, b| a.external_id.cmp(&b.external_id));
    plan.to_update
        .sort_by(|a, b| a.model.external_id.cmp(&b.model.external_id));

    plan
}

/// Whether the remote entry differs from the desired model in anything the
/// importer owns: name, rank, aliases or attribute values.
fn differs(model: &EntryModel, entry: &CatalogEntry) -> bool {
    model.name != entry.name
        || model.rank != entry.rank
        || model.aliases != entry.aliases
        || canonical(&model.attribute_values) != canonical(&entry.attribute_values)
}

/// Canonical view of a value map for comparison: bindings carrying no value
/// are equivalent to absent ones. Scalars compare by value, references by
/// external id (which is the carried value), arrays by ordered elements.
fn canonical(values: &HashMap<String, BoundValue>) -> HashMap<&str, &BoundValue> {
    values
        .iter()
        .filter(|(_, bound)| !bound.is_empty())
        .map(|(id, bound)| (id.as_str(), bound))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use catsync_catalog::AttributeValue;

    fn model(external_id: &str, name: &str) -> EntryModel {
        EntryModel {
            external_id: external_id.to_string(),
            name: name.to_string(),
            rank: 0,
            aliases: vec![],
            attribute_values: HashMap::new(),
        }
    }

    fn entry(external_id: &str, name: &str) -> CatalogEntry {
        CatalogEntry {
            id: format!("id-{external_id}"),
            external_id: external_id.to_string(),
            name: name.to_string(),
            rank: 0,
            aliases: vec![],
            attribute_values: HashMap::new(),
            annotations: HashMap::new(),
        }
    }

    #[test]
    fn test_classification_delete_create_update() {
        // Desired {1: A, 2: B}; remote {1: old, 3: gone}.
        let desired = vec![model("1", "A"), model("2", "B")];
        let existing = vec![entry("1", "old"), entry("3", "gone")];

        let plan = plan_entries(&desired, &existing);

        assert_eq!(
            plan.to_delete.iter().map(|e| e.external_id.as_str()).collect::<Vec<_>>(),
            vec!["3"]
        );
        assert_eq!(
            plan.to_create.iter().map(|m| m.external_id.as_str()).collect::<Vec<_>>(),
            vec!["2"]
        );
        assert_eq!(
            plan.to_update.iter().map(|u| u.model.external_id.as_str()).collect::<Vec<_>>(),
            vec!["1"]
        );
        assert_eq!(plan.unchanged, 0);
    }

    #[test]
    fn test_identical_entry_is_skipped() {
        let plan = plan_entries(&[model("1", "A")], &[entry("1", "A")]);
        assert!(plan.is_empty());
        assert_eq!(plan.unchanged, 1);
    }

    #[test]
    fn test_rank_change_is_an_update() {
        let mut desired = model("1", "A");
        desired.rank = 5;
        let plan = plan_entries(&[desired], &[entry("1", "A")]);
        assert_eq!(plan.to_update.len(), 1);
    }

    #[test]
    fn test_alias_change_is_an_update() {
        let mut desired = model("1", "A");
        desired.aliases = vec!["alias".to_string()];
        let plan = plan_entries(&[desired], &[entry("1", "A")]);
        assert_eq!(plan.to_update.len(), 1);
    }

    #[test]
    fn test_attribute_value_change_is_an_update() {
        let mut desired = model("1", "A");
        desired.attribute_values.insert(
            "team".to_string(),
            BoundValue::scalar(AttributeValue::string("T2")),
        );
        let mut remote = entry("1", "A");
        remote.attribute_values.insert(
            "team".to_string(),
            BoundValue::scalar(AttributeValue::string("T1")),
        );

        let plan = plan_entries(&[desired], &[remote]);
        assert_eq!(plan.to_update.len(), 1);
    }

    #[test]
    fn test_empty_binding_equals_absent() {
        let mut desired = model("1", "A");
        desired
            .attribute_values
            .insert("team".to_string(), BoundValue::array(vec![]));
        let remote = entry("1", "A");

        let plan = plan_entries(&[desired], &[remote]);
        assert_eq!(plan.unchanged, 1);
    }

    #[test]
    fn test_array_values_compare_by_ordered_elements() {
        let mut desired = model("1", "A");
        desired.attribute_values.insert(
            "tags".to_string(),
            BoundValue::array(vec![
                AttributeValue::string("a"),
                AttributeValue::string("b"),
            ]),
        );
        let mut remote = entry("1", "A");
        remote.attribute_values.insert(
            "tags".to_string(),
            BoundValue::array(vec![
                AttributeValue::string("b"),
                AttributeValue::string("a"),
            ]),
        );

        let plan = plan_entries(&[desired], &[remote]);
        assert_eq!(plan.to_update.len(), 1);
    }

    #[test]
    fn test_phases_are_sorted_by_external_id() {
        let desired = vec![model("b", "B"), model("a", "A"), model("c", "C")];
        let plan = plan_entries(&desired, &[]);

        let order: Vec<&str> = plan.to_create.iter().map(|m| m.external_id.as_str()).collect();
        assert_eq!(order, vec!["a", "b", "c"]);
    }
}
