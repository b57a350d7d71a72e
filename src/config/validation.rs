//! Load-time validation of payroll data.
//!
//! Checks every entity invariant the engine relies on and derives the
//! materialized group paths. The first violation found is returned.

use std::collections::{BTreeMap, HashMap, HashSet};

use rust_decimal::Decimal;

use crate::error::{EngineError, EngineResult};
use crate::models::RuleScope;
use crate::store::PayrollDataset;

/// Separator between group names in a derived `full_path`.
pub const PATH_SEPARATOR: &str = " → ";

/// Maximum depth of the organizational unit and group trees.
const MAX_TREE_DEPTH: u32 = 32;

fn invalid(entity: &'static str, id: i64, message: impl Into<String>) -> EngineError {
    EngineError::InvalidData {
        entity,
        id,
        message: message.into(),
    }
}

/// Validates `dataset` in place, filling in missing group `full_path`s.
pub fn validate_dataset(dataset: &mut PayrollDataset) -> EngineResult<()> {
    unique_ids("organizational unit", dataset.org_units.iter().map(|u| u.id))?;
    unique_ids("group", dataset.groups.iter().map(|g| g.id))?;
    unique_ids("employee", dataset.employees.iter().map(|e| e.id))?;
    unique_ids("position", dataset.positions.iter().map(|p| p.id))?;
    unique_ids("contract", dataset.contracts.iter().map(|c| c.id))?;
    unique_ids("position group", dataset.memberships.iter().map(|m| m.id))?;
    unique_ids("rule", dataset.rules.iter().map(|r| r.id))?;
    unique_ids("template", dataset.templates.iter().map(|t| t.id))?;
    unique_ids("period", dataset.periods.iter().map(|p| p.id))?;

    validate_tree(
        "organizational unit",
        dataset
            .org_units
            .iter()
            .map(|u| (u.id, u.parent_id, u.level)),
    )?;
    validate_tree(
        "group",
        dataset.groups.iter().map(|g| (g.id, g.parent_id, g.level)),
    )?;
    derive_group_paths(dataset);

    validate_positions(dataset)?;
    validate_contracts(dataset)?;
    validate_memberships(dataset)?;
    validate_rules(dataset)?;
    validate_templates(dataset)?;
    validate_periods(dataset)?;

    Ok(())
}

fn unique_ids(entity: &'static str, ids: impl Iterator<Item = i64>) -> EngineResult<()> {
    let mut seen = HashSet::new();
    for id in ids {
        if !seen.insert(id) {
            return Err(invalid(entity, id, "duplicate id"));
        }
    }
    Ok(())
}

/// Checks a parent-pointer tree: no self-parenting, known parents, roots at
/// level 1, every child one level below its parent, and no cycles.
fn validate_tree(
    entity: &'static str,
    nodes: impl Iterator<Item = (i64, Option<i64>, u32)>,
) -> EngineResult<()> {
    let nodes: BTreeMap<i64, (Option<i64>, u32)> =
        nodes.map(|(id, parent, level)| (id, (parent, level))).collect();

    for (&id, &(parent_id, level)) in &nodes {
        if level == 0 {
            return Err(invalid(entity, id, "level must be greater than zero"));
        }
        if level > MAX_TREE_DEPTH {
            return Err(invalid(
                entity,
                id,
                format!("level {} exceeds maximum depth {}", level, MAX_TREE_DEPTH),
            ));
        }

        match parent_id {
            None if level != 1 => {
                return Err(invalid(entity, id, format!("root node has level {}", level)));
            }
            None => {}
            Some(parent_id) if parent_id == id => {
                return Err(invalid(entity, id, "node cannot be its own parent"));
            }
            Some(parent_id) => {
                let (_, parent_level) = nodes.get(&parent_id).ok_or_else(|| {
                    invalid(entity, id, format!("unknown parent {}", parent_id))
                })?;
                if level != parent_level + 1 {
                    return Err(invalid(
                        entity,
                        id,
                        format!(
                            "level {} does not follow parent level {}",
                            level, parent_level
                        ),
                    ));
                }
            }
        }

        // Levels already rule out cycles; the walk is bounded regardless.
        let mut current = parent_id;
        let mut steps = 0;
        while let Some(ancestor) = current {
            if ancestor == id || steps > nodes.len() {
                return Err(invalid(entity, id, "node is its own ancestor"));
            }
            current = nodes.get(&ancestor).and_then(|(parent, _)| *parent);
            steps += 1;
        }
    }

    Ok(())
}

fn derive_group_paths(dataset: &mut PayrollDataset) {
    let mut order: Vec<usize> = (0..dataset.groups.len()).collect();
    order.sort_by_key(|&i| dataset.groups[i].level);

    let mut paths: HashMap<i64, String> = HashMap::new();
    for i in order {
        let group = &mut dataset.groups[i];
        let path = match &group.full_path {
            Some(path) => path.clone(),
            None => match group.parent_id.and_then(|p| paths.get(&p)) {
                Some(parent_path) => format!("{}{}{}", parent_path, PATH_SEPARATOR, group.name),
                None => group.name.clone(),
            },
        };
        group.full_path = Some(path.clone());
        paths.insert(group.id, path);
    }
}

fn validate_positions(dataset: &PayrollDataset) -> EngineResult<()> {
    let employees: HashSet<i64> = dataset.employees.iter().map(|e| e.id).collect();
    let units: HashSet<i64> = dataset.org_units.iter().map(|u| u.id).collect();
    let max_rate = Decimal::TWO;

    for position in &dataset.positions {
        if !employees.contains(&position.employee_id) {
            return Err(invalid(
                "position",
                position.id,
                format!("unknown employee {}", position.employee_id),
            ));
        }
        if !units.contains(&position.organizational_unit_id) {
            return Err(invalid(
                "position",
                position.id,
                format!(
                    "unknown organizational unit {}",
                    position.organizational_unit_id
                ),
            ));
        }
        if position.employment_rate <= Decimal::ZERO || position.employment_rate > max_rate {
            return Err(invalid(
                "position",
                position.id,
                format!(
                    "employment rate {} must be in (0, 2.0]",
                    position.employment_rate
                ),
            ));
        }
        if position.end_date.is_some_and(|end| end < position.start_date) {
            return Err(invalid("position", position.id, "end date precedes start date"));
        }
    }
    Ok(())
}

fn validate_contracts(dataset: &PayrollDataset) -> EngineResult<()> {
    let positions: HashSet<i64> = dataset.positions.iter().map(|p| p.id).collect();

    for contract in &dataset.contracts {
        if !positions.contains(&contract.position_id) {
            return Err(invalid(
                "contract",
                contract.id,
                format!("unknown position {}", contract.position_id),
            ));
        }
        if contract.base_rate < Decimal::ZERO {
            return Err(invalid("contract", contract.id, "base rate must not be negative"));
        }
        if contract
            .end_datetime
            .is_some_and(|end| end <= contract.start_datetime)
        {
            return Err(invalid("contract", contract.id, "end must be after start"));
        }
    }
    Ok(())
}

fn validate_memberships(dataset: &PayrollDataset) -> EngineResult<()> {
    let positions: HashSet<i64> = dataset.positions.iter().map(|p| p.id).collect();
    let groups: HashSet<i64> = dataset.groups.iter().map(|g| g.id).collect();
    let mut keys = HashSet::new();

    for membership in &dataset.memberships {
        if !positions.contains(&membership.position_id) {
            return Err(invalid(
                "position group",
                membership.id,
                format!("unknown position {}", membership.position_id),
            ));
        }
        if !groups.contains(&membership.group_id) {
            return Err(invalid(
                "position group",
                membership.id,
                format!("unknown group {}", membership.group_id),
            ));
        }
        if membership
            .valid_until
            .is_some_and(|until| until <= membership.valid_from)
        {
            return Err(invalid(
                "position group",
                membership.id,
                "valid_until must be after valid_from",
            ));
        }
        if !keys.insert((membership.position_id, membership.group_id, membership.valid_from)) {
            return Err(invalid(
                "position group",
                membership.id,
                "duplicate (position, group, valid_from)",
            ));
        }
    }
    Ok(())
}

fn validate_rules(dataset: &PayrollDataset) -> EngineResult<()> {
    let positions: HashSet<i64> = dataset.positions.iter().map(|p| p.id).collect();
    let groups: HashSet<i64> = dataset.groups.iter().map(|g| g.id).collect();
    let units: HashSet<i64> = dataset.org_units.iter().map(|u| u.id).collect();

    for rule in &dataset.rules {
        let target_known = match rule.scope {
            RuleScope::Position(id) => positions.contains(&id),
            RuleScope::Group(id) => groups.contains(&id),
            RuleScope::OrgUnit(id) => units.contains(&id),
            RuleScope::Global => true,
        };
        if !target_known {
            return Err(invalid(
                "rule",
                rule.id,
                format!("scope {:?} refers to an unknown entity", rule.scope),
            ));
        }
        if rule.valid_until.is_some_and(|until| until <= rule.valid_from) {
            return Err(invalid("rule", rule.id, "valid_until must be after valid_from"));
        }
        if rule.max_combined_amount.is_some_and(|cap| cap < Decimal::ZERO) {
            return Err(invalid("rule", rule.id, "max_combined_amount must not be negative"));
        }
    }
    Ok(())
}

fn validate_templates(dataset: &PayrollDataset) -> EngineResult<()> {
    let mut codes = HashSet::new();
    for template in &dataset.templates {
        if !codes.insert(template.code.as_str()) {
            return Err(invalid(
                "template",
                template.id,
                format!("duplicate code '{}'", template.code),
            ));
        }
    }
    Ok(())
}

fn validate_periods(dataset: &PayrollDataset) -> EngineResult<()> {
    let employees: HashSet<i64> = dataset.employees.iter().map(|e| e.id).collect();
    let units: HashSet<i64> = dataset.org_units.iter().map(|u| u.id).collect();

    for period in &dataset.periods {
        if period.end_date < period.start_date {
            return Err(invalid("period", period.id, "end date precedes start date"));
        }
        if period.employee_id.is_some_and(|id| !employees.contains(&id)) {
            return Err(invalid("period", period.id, "unknown employee scope"));
        }
        if period
            .organizational_unit_id
            .is_some_and(|id| !units.contains(&id))
        {
            return Err(invalid("period", period.id, "unknown organizational unit scope"));
        }
    }
    Ok(())
}
