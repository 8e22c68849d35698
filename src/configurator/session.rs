//! The host that owns the parts map and commits resolved changes.

use tracing::{debug, info, warn};

use super::history::History;
use super::intercept::{ChangeIntercept, Resolution, RuleSource};
use super::observer::{ChangeAction, ObserverId, ObserverRegistry, PartsChanged, PartsObserver};
use crate::config::{EngineOptions, ProductConfig, RestrictionRule, SyncRules};
use crate::error::CustomizeError;
use crate::parts::{diff_parts, Part, PartValue, PartsMap};

/// One product being customized.
///
/// Every change goes through the intercept pass on a copy of the parts map
/// and is committed only when the whole pass succeeds. Observers are
/// notified once per commit with the consolidated diff.
#[derive(Debug)]
pub struct Configurator {
    options: EngineOptions,
    config: Option<ProductConfig>,
    parts: PartsMap,
    intercept: ChangeIntercept,
    history: History,
    observers: ObserverRegistry,
}

impl Default for Configurator {
    fn default() -> Self {
        Self::new(EngineOptions::default())
    }
}

impl Configurator {
    pub fn new(options: EngineOptions) -> Self {
        let intercept = ChangeIntercept::new(&options);
        Self {
            options,
            config: None,
            parts: PartsMap::new(),
            intercept,
            history: History::new(),
            observers: ObserverRegistry::default(),
        }
    }

    /// Creates a configurator and loads `config` into it.
    pub fn with_config(config: ProductConfig, options: EngineOptions) -> Result<Self, CustomizeError> {
        let mut configurator = Self::new(options);
        configurator.load_config(config)?;
        Ok(configurator)
    }

    // =========================================================================
    // CONFIGURATION
    // =========================================================================

    /// Loads a product: applies its defaults, runs them through the rules
    /// and starts a fresh history.
    ///
    /// Defaults that violate the rules are kept as served (with a warning)
    /// rather than failing the load.
    pub fn load_config(&mut self, config: ProductConfig) -> Result<PartsChanged, CustomizeError> {
        config.validate()?;
        self.intercept.reload(&config);

        let defaults = config.default_parts();
        let next = match self.intercept.resolve(&config, &defaults, None) {
            Ok(resolution) => resolution.parts,
            Err(err) => {
                warn!("Product defaults do not satisfy the rules: {}", err);
                defaults
            }
        };

        info!(
            "Loaded product with {} catalog parts, {} restriction rules, {} sync rules",
            config.parts.len(),
            config.restrictions.len(),
            config.sync.len()
        );
        self.config = Some(config);
        self.history.clear();
        Ok(self.commit(ChangeAction::Config, Vec::new(), next))
    }

    pub fn config(&self) -> Option<&ProductConfig> {
        self.config.as_ref()
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    pub fn intercept(&self) -> &ChangeIntercept {
        &self.intercept
    }

    /// Replaces the restriction rules with a fixed set that survives
    /// configuration loads.
    pub fn set_restrictions(&mut self, rules: Vec<RestrictionRule>) {
        self.intercept
            .set_restrictions(RuleSource::Manual(rules), self.config.as_ref());
    }

    /// Makes the restriction stage follow the loaded configuration again.
    pub fn use_config_restrictions(&mut self) {
        self.intercept
            .set_restrictions(RuleSource::Config, self.config.as_ref());
    }

    pub fn clear_restrictions(&mut self) {
        self.intercept.clear_restrictions();
    }

    /// Replaces the sync rules with a fixed set that survives configuration
    /// loads.
    pub fn set_sync(&mut self, rules: SyncRules) {
        self.intercept
            .set_sync(RuleSource::Manual(rules), self.config.as_ref());
    }

    pub fn use_config_sync(&mut self) {
        self.intercept.set_sync(RuleSource::Config, self.config.as_ref());
    }

    pub fn clear_sync(&mut self) {
        self.intercept.clear_sync();
    }

    // =========================================================================
    // CHANGES
    // =========================================================================

    /// Requests `part` to take `material`/`color`.
    ///
    /// Returns `Ok(None)` when the part already has that value.
    pub fn set_part(
        &mut self,
        part: &str,
        material: &str,
        color: &str,
    ) -> Result<Option<PartsChanged>, CustomizeError> {
        self.set_part_with(Part::new(part, material, color), false)
    }

    /// Requests an optional part to be dropped.
    pub fn remove_part(&mut self, part: &str) -> Result<Option<PartsChanged>, CustomizeError> {
        self.set_part_with(Part::empty(part), false)
    }

    /// Runs one requested change through the rules and commits the result.
    ///
    /// With `force` the pass runs even when the part already has the
    /// requested value.
    pub fn set_part_with(
        &mut self,
        part: Part,
        force: bool,
    ) -> Result<Option<PartsChanged>, CustomizeError> {
        let config = self.config.as_ref().ok_or(CustomizeError::NotConfigured)?;
        validate_change(config, &part)?;

        if !force && self.current_value(&part.name) == part.value() {
            debug!("Part {} already has the requested value", part.name);
            return Ok(None);
        }

        let resolution = self
            .intercept
            .resolve(config, &self.parts, Some(&part))
            .map_err(|err| {
                warn!("Rejected change of {}: {}", part.name, err);
                err
            })?;

        Ok(Some(self.commit(ChangeAction::Set, vec![part], resolution.parts)))
    }

    /// Applies several changes in order as one commit. If any of them is
    /// rejected, none is applied.
    pub fn set_parts(&mut self, parts: Vec<Part>) -> Result<Option<PartsChanged>, CustomizeError> {
        let config = self.config.as_ref().ok_or(CustomizeError::NotConfigured)?;
        for part in &parts {
            validate_change(config, part)?;
        }

        let mut working = self.parts.clone();
        let mut applied = Vec::with_capacity(parts.len());
        for part in parts {
            let current = working.get(&part.name).cloned().unwrap_or_default();
            if current == part.value() {
                continue;
            }
            let Resolution { parts: next, .. } = self
                .intercept
                .resolve(config, &working, Some(&part))
                .map_err(|err| {
                    warn!("Rejected bulk change at {}: {}", part.name, err);
                    err
                })?;
            working = next;
            applied.push(part);
        }

        if applied.is_empty() {
            return Ok(None);
        }
        Ok(Some(self.commit(ChangeAction::Bulk, applied, working)))
    }

    /// Re-runs the current parts through the rules, for example after the
    /// rule stages were replaced.
    pub fn resolve(&mut self) -> Result<PartsChanged, CustomizeError> {
        let config = self.config.as_ref().ok_or(CustomizeError::NotConfigured)?;
        let resolution = self.intercept.resolve(config, &self.parts, None)?;
        Ok(self.commit(ChangeAction::Resolve, Vec::new(), resolution.parts))
    }

    // =========================================================================
    // HISTORY
    // =========================================================================

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn undo(&mut self) -> Option<PartsChanged> {
        let state = self.history.undo()?.clone();
        Some(self.restore(ChangeAction::Undo, state))
    }

    pub fn undo_all(&mut self) -> Option<PartsChanged> {
        let state = self.history.undo_all()?.clone();
        Some(self.restore(ChangeAction::Undo, state))
    }

    pub fn redo(&mut self) -> Option<PartsChanged> {
        let state = self.history.redo()?.clone();
        Some(self.restore(ChangeAction::Redo, state))
    }

    pub fn redo_all(&mut self) -> Option<PartsChanged> {
        let state = self.history.redo_all()?.clone();
        Some(self.restore(ChangeAction::Redo, state))
    }

    // =========================================================================
    // QUERIES
    // =========================================================================

    pub fn parts(&self) -> &PartsMap {
        &self.parts
    }

    pub fn part(&self, name: &str) -> Option<&PartValue> {
        self.parts.get(name)
    }

    /// The parts map with an empty entry for every optional part that is
    /// currently absent.
    pub fn normalized_parts(&self) -> PartsMap {
        let mut parts = self.parts.clone();
        if let Some(config) = &self.config {
            for name in config.optional_parts() {
                parts.entry(name).or_insert_with(PartValue::empty);
            }
        }
        parts
    }

    /// Whether every required catalog part has a value.
    pub fn is_complete(&self) -> bool {
        let Some(config) = &self.config else {
            return false;
        };
        config
            .parts
            .iter()
            .filter(|option| !config.is_optional(&option.name))
            .all(|option| !self.current_value(&option.name).is_empty())
    }

    // =========================================================================
    // OBSERVERS
    // =========================================================================

    pub fn subscribe(&mut self, observer: impl PartsObserver + 'static) -> ObserverId {
        self.observers.subscribe(Box::new(observer))
    }

    pub fn unsubscribe(&mut self, id: ObserverId) -> bool {
        self.observers.unsubscribe(id)
    }

    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }

    fn current_value(&self, name: &str) -> PartValue {
        self.parts.get(name).cloned().unwrap_or_default()
    }

    fn commit(&mut self, action: ChangeAction, trigger: Vec<Part>, next: PartsMap) -> PartsChanged {
        let changes = diff_parts(&self.parts, &next);
        self.parts = next;
        self.history.push(&self.parts);

        info!("Committed {:?} with {} part changes", action, changes.len());
        let event = PartsChanged {
            action,
            trigger,
            changes,
        };
        self.observers.notify(&event);
        event
    }

    fn restore(&mut self, action: ChangeAction, state: PartsMap) -> PartsChanged {
        let changes = diff_parts(&self.parts, &state);
        self.parts = state;

        debug!("Restored history state ({:?}, {} part changes)", action, changes.len());
        let event = PartsChanged {
            action,
            trigger: Vec::new(),
            changes,
        };
        self.observers.notify(&event);
        event
    }
}

fn validate_change(config: &ProductConfig, part: &Part) -> Result<(), CustomizeError> {
    if !config.knows_part(&part.name) {
        return Err(CustomizeError::UnknownPart(part.name.clone()));
    }
    if part.is_empty() && !config.is_optional(&part.name) {
        return Err(CustomizeError::RequiredPart(part.name.clone()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{MaterialOption, PartDefault, PartOption, RestrictionPattern};
    use std::cell::RefCell;
    use std::rc::Rc;

    fn option(name: &str, materials: &[(&str, &[&str])]) -> PartOption {
        PartOption {
            name: name.to_string(),
            materials: materials
                .iter()
                .map(|(material, colors)| MaterialOption {
                    name: material.to_string(),
                    colors: colors.iter().map(|c| c.to_string()).collect(),
                })
                .collect(),
        }
    }

    fn default(material: &str, color: &str, optional: bool) -> PartDefault {
        PartDefault {
            material: Some(material.to_string()),
            color: Some(color.to_string()),
            optional,
        }
    }

    fn product() -> ProductConfig {
        let mut config = ProductConfig {
            parts: vec![
                option("upper", &[("nappa", &["black", "white"])]),
                option("bottom", &[("nappa", &["black", "white"])]),
                option("logo", &[("metal", &["gold", "silver"])]),
            ],
            restrictions: vec![RestrictionRule::Exclusive(vec![
                RestrictionPattern::color("black"),
                RestrictionPattern::color("white"),
            ])],
            ..ProductConfig::default()
        };
        config.defaults.insert("upper".to_string(), default("nappa", "black", false));
        config.defaults.insert("bottom".to_string(), default("nappa", "black", false));
        config.defaults.insert("logo".to_string(), default("metal", "gold", true));
        config
    }

    #[test]
    fn test_change_before_config_is_rejected() {
        let mut configurator = Configurator::default();
        assert_eq!(
            configurator.set_part("upper", "nappa", "white"),
            Err(CustomizeError::NotConfigured)
        );
    }

    #[test]
    fn test_load_config_applies_defaults() {
        let mut configurator = Configurator::default();
        let event = configurator.load_config(product()).unwrap();

        assert_eq!(event.action, ChangeAction::Config);
        assert_eq!(event.changes.len(), 3);
        assert_eq!(configurator.part("upper"), Some(&PartValue::new("nappa", "black")));
        assert!(configurator.is_complete());
        assert!(!configurator.can_undo());
    }

    #[test]
    fn test_set_part_commits_resolved_state() {
        let mut configurator = Configurator::with_config(product(), EngineOptions::default()).unwrap();

        let event = configurator
            .set_part("bottom", "nappa", "white")
            .unwrap()
            .expect("change should be committed");

        assert_eq!(event.trigger, vec![Part::new("bottom", "nappa", "white")]);
        assert_eq!(event.changes.len(), 2);
        assert_eq!(configurator.part("upper"), Some(&PartValue::new("nappa", "white")));
    }

    #[test]
    fn test_unchanged_value_is_noop() {
        let mut configurator = Configurator::with_config(product(), EngineOptions::default()).unwrap();
        assert_eq!(configurator.set_part("upper", "nappa", "black"), Ok(None));
        assert!(!configurator.can_undo());
    }

    #[test]
    fn test_required_part_cannot_be_removed() {
        let mut configurator = Configurator::with_config(product(), EngineOptions::default()).unwrap();
        let before = configurator.parts().clone();

        assert_eq!(
            configurator.remove_part("upper"),
            Err(CustomizeError::RequiredPart("upper".to_string()))
        );
        assert_eq!(configurator.parts(), &before, "Rejected change must not leak");
    }

    #[test]
    fn test_unknown_part_rejected() {
        let mut configurator = Configurator::with_config(product(), EngineOptions::default()).unwrap();
        assert_eq!(
            configurator.set_part("heel", "rubber", "red"),
            Err(CustomizeError::UnknownPart("heel".to_string()))
        );
    }

    #[test]
    fn test_optional_part_removed_and_normalized() {
        let mut configurator = Configurator::with_config(product(), EngineOptions::default()).unwrap();
        configurator.remove_part("logo").unwrap();

        assert!(configurator.part("logo").is_none());
        let normalized = configurator.normalized_parts();
        assert_eq!(normalized.get("logo"), Some(&PartValue::empty()));
        assert!(configurator.is_complete());
    }

    #[test]
    fn test_undo_and_redo_restore_states() {
        let mut configurator = Configurator::with_config(product(), EngineOptions::default()).unwrap();
        configurator.set_part("bottom", "nappa", "white").unwrap();
        configurator.set_part("logo", "metal", "silver").unwrap();

        let undo = configurator.undo().expect("should undo");
        assert_eq!(undo.action, ChangeAction::Undo);
        assert_eq!(configurator.part("logo"), Some(&PartValue::new("metal", "gold")));

        configurator.undo_all();
        assert_eq!(configurator.part("upper"), Some(&PartValue::new("nappa", "black")));
        assert!(!configurator.can_undo());

        configurator.redo_all();
        assert_eq!(configurator.part("logo"), Some(&PartValue::new("metal", "silver")));
        assert!(configurator.redo().is_none());
    }

    #[test]
    fn test_bulk_change_notifies_once() {
        let mut configurator = Configurator::with_config(product(), EngineOptions::default()).unwrap();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        configurator.subscribe(move |event: &PartsChanged| sink.borrow_mut().push(event.action));

        configurator
            .set_parts(vec![
                Part::new("upper", "nappa", "white"),
                Part::new("logo", "metal", "silver"),
            ])
            .unwrap();

        assert_eq!(*seen.borrow(), vec![ChangeAction::Bulk]);
        assert_eq!(configurator.part("bottom"), Some(&PartValue::new("nappa", "white")));
    }

    #[test]
    fn test_bulk_change_is_all_or_nothing() {
        let mut configurator = Configurator::with_config(product(), EngineOptions::default()).unwrap();
        let before = configurator.parts().clone();

        let result = configurator.set_parts(vec![
            Part::new("upper", "nappa", "white"),
            Part::empty("bottom"),
        ]);
        assert_eq!(result, Err(CustomizeError::RequiredPart("bottom".to_string())));
        assert_eq!(configurator.parts(), &before);
    }

    #[test]
    fn test_bulk_trigger_lists_applied_parts_only() {
        let mut configurator = Configurator::with_config(product(), EngineOptions::default()).unwrap();

        let event = configurator
            .set_parts(vec![
                Part::new("upper", "nappa", "black"),
                Part::new("logo", "metal", "silver"),
            ])
            .unwrap()
            .expect("logo change should be committed");
        assert_eq!(
            event.trigger,
            vec![Part::new("logo", "metal", "silver")],
            "Unchanged upper should not be reported as a trigger"
        );
    }

    #[test]
    fn test_removing_last_part_can_be_undone() {
        let mut config = ProductConfig {
            parts: vec![option("logo", &[("metal", &["gold", "silver"])])],
            ..ProductConfig::default()
        };
        config.defaults.insert("logo".to_string(), default("metal", "gold", true));
        let mut configurator = Configurator::with_config(config, EngineOptions::default()).unwrap();

        configurator.remove_part("logo").unwrap();
        assert!(configurator.parts().is_empty());
        assert!(configurator.can_undo(), "Empty state should be recorded");

        configurator.undo().expect("should undo the removal");
        assert_eq!(configurator.part("logo"), Some(&PartValue::new("metal", "gold")));

        configurator.redo().expect("should redo the removal");
        assert!(configurator.parts().is_empty());

        configurator.set_part("logo", "metal", "silver").unwrap();
        configurator.undo().expect("should undo back to the empty state");
        assert!(
            configurator.parts().is_empty(),
            "Undo should land on the empty state, not skip it"
        );
    }

    #[test]
    fn test_manual_restrictions_replace_config() {
        let mut configurator = Configurator::with_config(product(), EngineOptions::default()).unwrap();
        configurator.set_restrictions(Vec::new());
        configurator.set_part("bottom", "nappa", "white").unwrap();
        assert_eq!(configurator.part("upper"), Some(&PartValue::new("nappa", "black")));

        configurator.use_config_restrictions();
        let event = configurator.resolve().unwrap();
        assert_eq!(event.action, ChangeAction::Resolve);
        assert_eq!(
            configurator.part("upper").and_then(|v| v.color.as_deref()),
            configurator.part("bottom").and_then(|v| v.color.as_deref()),
            "Re-resolving should remove the color conflict"
        );
    }
}
