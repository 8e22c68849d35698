//! The resolve pass run for every requested change, before it is committed.
//!
//! Restrictions run first to produce a conflict-free baseline; sync runs
//! second so its equivalences are never overridden. The pass works on a
//! copy of the parts map and either returns the complete next state or an
//! error, so a failed change leaves nothing behind.

use tracing::debug;

use crate::config::{EngineOptions, ProductConfig, RestrictionRule, SyncRules};
use crate::error::CustomizeError;
use crate::parts::{apply_part, Part, PartsMap};
use crate::restrictions::{
    KeyEncoder, RestrictionSolver, RestrictionsMap, RuleIndex, SolveOutcome, SolverStatistics,
};
use crate::sync::SyncResolver;

/// Where a stage takes its rules from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleSource<T> {
    /// Follow the loaded product configuration, rebuilt on every load
    Config,
    /// Fixed rules that override the configuration
    Manual(T),
}

#[derive(Debug, Clone)]
struct RestrictionStage {
    source: RuleSource<Vec<RestrictionRule>>,
    map: RestrictionsMap,
}

#[derive(Debug, Clone)]
struct SyncStage {
    source: RuleSource<SyncRules>,
    resolver: SyncResolver,
}

/// Outcome of a successful resolve pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// The complete next assignment map
    pub parts: PartsMap,
    /// Solver counters, when the restriction stage ran
    pub statistics: Option<SolverStatistics>,
}

#[derive(Debug, Clone)]
pub struct ChangeIntercept {
    index: RuleIndex,
    restrictions: Option<RestrictionStage>,
    sync: Option<SyncStage>,
}

impl ChangeIntercept {
    /// Registers the stages enabled in `options`, both following the config.
    pub fn new(options: &EngineOptions) -> Self {
        let mut intercept = Self {
            index: RuleIndex::new(KeyEncoder::new(options.token.clone())),
            restrictions: None,
            sync: None,
        };
        if options.restrictions {
            intercept.set_restrictions(RuleSource::Config, None);
        }
        if options.sync {
            intercept.set_sync(RuleSource::Config, None);
        }
        intercept
    }

    pub fn keys(&self) -> &KeyEncoder {
        self.index.keys()
    }

    pub fn has_restrictions(&self) -> bool {
        self.restrictions.is_some()
    }

    pub fn has_sync(&self) -> bool {
        self.sync.is_some()
    }

    pub fn restrictions_map(&self) -> Option<&RestrictionsMap> {
        self.restrictions.as_ref().map(|stage| &stage.map)
    }

    pub fn sync_rules(&self) -> Option<&SyncRules> {
        self.sync.as_ref().map(|stage| stage.resolver.rules())
    }

    pub fn set_restrictions(
        &mut self,
        source: RuleSource<Vec<RestrictionRule>>,
        config: Option<&ProductConfig>,
    ) {
        let rules: &[RestrictionRule] = match (&source, config) {
            (RuleSource::Manual(rules), _) => rules,
            (RuleSource::Config, Some(config)) => &config.restrictions,
            (RuleSource::Config, None) => &[],
        };
        let map = self.index.build(rules);
        self.restrictions = Some(RestrictionStage { source, map });
    }

    pub fn clear_restrictions(&mut self) {
        self.restrictions = None;
    }

    pub fn set_sync(&mut self, source: RuleSource<SyncRules>, config: Option<&ProductConfig>) {
        let rules = match (&source, config) {
            (RuleSource::Manual(rules), _) => rules.clone(),
            (RuleSource::Config, Some(config)) => config.sync.clone(),
            (RuleSource::Config, None) => SyncRules::new(),
        };
        self.sync = Some(SyncStage {
            source,
            resolver: SyncResolver::new(rules),
        });
    }

    pub fn clear_sync(&mut self) {
        self.sync = None;
    }

    /// Rebuilds the config-sourced stages for a newly loaded product.
    pub fn reload(&mut self, config: &ProductConfig) {
        if let Some(stage) = &mut self.restrictions {
            if stage.source == RuleSource::Config {
                stage.map = self.index.build(&config.restrictions);
            }
        }
        if let Some(stage) = &mut self.sync {
            if stage.source == RuleSource::Config {
                stage.resolver = SyncResolver::new(config.sync.clone());
            }
        }
        debug!(
            "Reloaded rule stages (restrictions: {}, sync: {})",
            self.has_restrictions(),
            self.has_sync()
        );
    }

    /// Runs the resolve pass for `change` (or for the current state when
    /// `change` is `None`) against `parts`.
    pub fn resolve(
        &self,
        config: &ProductConfig,
        parts: &PartsMap,
        change: Option<&Part>,
    ) -> Result<Resolution, CustomizeError> {
        let mut next = parts.clone();
        if let Some(part) = change {
            apply_part(&mut next, part);
        }

        let mut statistics = None;
        if let Some(stage) = &self.restrictions {
            // The changed part goes last so it is validated first and kept.
            let mut customization: Vec<Part> = next
                .iter()
                .filter(|(name, _)| change.map_or(true, |part| part.name != **name))
                .map(|(name, value)| Part::with_value(name.clone(), value))
                .collect();
            if let Some(part) = change {
                customization.push(part.clone());
            }

            let optionals = config.optional_parts();
            let solver =
                RestrictionSolver::new(&config.parts, &optionals, &stage.map, self.index.keys());
            let (outcome, stats) = solver.solve_with_statistics(customization);
            statistics = Some(stats);

            match outcome {
                SolveOutcome::Solved(solution) => {
                    for part in &solution {
                        apply_part(&mut next, part);
                    }
                }
                SolveOutcome::Unsatisfiable(part) => {
                    return Err(CustomizeError::Unsatisfiable(part));
                }
                SolveOutcome::Incomplete(part) => {
                    return Err(CustomizeError::Incomplete(part));
                }
            }
        }

        if let Some(stage) = &self.sync {
            let changed = change.map(|part| match next.get(&part.name) {
                Some(value) => Part::with_value(part.name.clone(), value),
                None => Part::empty(part.name.clone()),
            });
            let written = stage.resolver.apply(&mut next, changed.as_ref());
            if !written.is_empty() {
                debug!("Sync wrote {} parts: {}", written.len(), written.join(", "));
            }
        }

        if let (Some(part), Some(stats)) = (change, statistics) {
            debug!(
                "Resolved change of {} ({} rejected, {} dropped)",
                part.name, stats.rejected, stats.dropped
            );
        }

        Ok(Resolution {
            parts: next,
            statistics,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{MaterialOption, PartDefault, PartOption, RestrictionPattern, SyncEntry};
    use crate::parts::{diff_parts, PartValue};

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

    fn shoe_config() -> ProductConfig {
        let mut config = ProductConfig {
            parts: vec![
                option("upper", &[("nappa", &["black", "white"])]),
                option("bottom", &[("nappa", &["black", "white"])]),
            ],
            restrictions: vec![RestrictionRule::Exclusive(vec![
                RestrictionPattern::color("black"),
                RestrictionPattern::color("white"),
            ])],
            ..ProductConfig::default()
        };
        for name in ["upper", "bottom"] {
            config.defaults.insert(
                name.to_string(),
                PartDefault {
                    material: Some("nappa".to_string()),
                    color: Some("black".to_string()),
                    optional: false,
                },
            );
        }
        config
    }

    #[test]
    fn test_restriction_stage_resolves_change() {
        let config = shoe_config();
        let mut intercept = ChangeIntercept::new(&EngineOptions::default());
        intercept.reload(&config);

        let resolution = intercept
            .resolve(
                &config,
                &config.default_parts(),
                Some(&Part::new("bottom", "nappa", "white")),
            )
            .unwrap();

        assert_eq!(resolution.parts["upper"], PartValue::new("nappa", "white"));
        assert_eq!(resolution.parts["bottom"], PartValue::new("nappa", "white"));
        assert_eq!(diff_parts(&config.default_parts(), &resolution.parts).len(), 2);
        assert_eq!(resolution.statistics.map(|s| s.rejected), Some(1));
    }

    #[test]
    fn test_without_stages_change_is_applied_verbatim() {
        let config = shoe_config();
        let options = EngineOptions {
            restrictions: false,
            sync: false,
            ..EngineOptions::default()
        };
        let intercept = ChangeIntercept::new(&options);

        let resolution = intercept
            .resolve(
                &config,
                &config.default_parts(),
                Some(&Part::new("bottom", "nappa", "white")),
            )
            .unwrap();

        assert_eq!(resolution.parts["upper"], PartValue::new("nappa", "black"));
        assert_eq!(diff_parts(&config.default_parts(), &resolution.parts).len(), 1);
        assert!(resolution.statistics.is_none());
    }

    #[test]
    fn test_manual_rules_survive_reload() {
        let config = shoe_config();
        let mut intercept = ChangeIntercept::new(&EngineOptions::default());
        intercept.set_restrictions(RuleSource::Manual(vec![]), None);
        intercept.reload(&config);

        assert_eq!(intercept.restrictions_map().map(|m| m.len()), Some(0));

        let resolution = intercept
            .resolve(
                &config,
                &config.default_parts(),
                Some(&Part::new("bottom", "nappa", "white")),
            )
            .unwrap();
        assert_eq!(resolution.parts["upper"], PartValue::new("nappa", "black"));
    }

    #[test]
    fn test_sync_alone_copies_changed_part() {
        let mut config = shoe_config();
        config.restrictions.clear();
        config.sync.insert(
            "full".to_string(),
            vec![SyncEntry::part("upper"), SyncEntry::part("bottom")],
        );
        let mut intercept = ChangeIntercept::new(&EngineOptions::default());
        intercept.reload(&config);

        let resolution = intercept
            .resolve(
                &config,
                &config.default_parts(),
                Some(&Part::new("bottom", "nappa", "white")),
            )
            .unwrap();
        assert_eq!(resolution.parts["upper"], PartValue::new("nappa", "white"));
    }

    #[test]
    fn test_sync_overwrites_solver_result() {
        let mut config = shoe_config();
        config.parts[0] = option("upper", &[("nappa", &["black", "white"]), ("suede", &["white"])]);
        config.parts.push(option("lining", &[("nappa", &["black", "white"])]));
        config.defaults.insert(
            "lining".to_string(),
            PartDefault {
                material: Some("nappa".to_string()),
                color: Some("black".to_string()),
                optional: false,
            },
        );
        config.sync.insert(
            "full".to_string(),
            vec![
                SyncEntry::part("bottom"),
                SyncEntry::pinned("upper", Some("suede"), None),
            ],
        );
        let mut intercept = ChangeIntercept::new(&EngineOptions::default());
        intercept.reload(&config);

        let before = config.default_parts();
        let resolution = intercept
            .resolve(&config, &before, Some(&Part::new("bottom", "nappa", "white")))
            .unwrap();

        // The solver recolors upper and lining to nappa/white, then sync
        // rewrites upper with its pinned material.
        assert_eq!(resolution.statistics.map(|s| s.rejected), Some(2));
        assert_eq!(resolution.parts["upper"], PartValue::new("suede", "white"));
        assert_eq!(resolution.parts["bottom"], PartValue::new("nappa", "white"));
        assert_eq!(resolution.parts["lining"], PartValue::new("nappa", "white"));

        let changes = diff_parts(&before, &resolution.parts);
        let summary: Vec<(&str, Option<&str>, Option<&str>)> = changes
            .iter()
            .map(|c| (c.to.part.as_str(), c.to.material.as_deref(), c.to.color.as_deref()))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("upper", Some("suede"), Some("white")),
                ("bottom", Some("nappa"), Some("white")),
                ("lining", Some("nappa"), Some("white")),
            ],
            "Diff should only show the final value of each part"
        );
        assert!(changes.iter().all(|c| c.from.color.as_deref() == Some("black")));
    }

    #[test]
    fn test_unsatisfiable_change_is_error() {
        let mut config = shoe_config();
        config.restrictions = vec![
            RestrictionRule::Forbidden(RestrictionPattern::color("white")),
            RestrictionRule::Forbidden(RestrictionPattern::color("black")),
        ];
        let mut intercept = ChangeIntercept::new(&EngineOptions::default());
        intercept.reload(&config);

        let err = intercept
            .resolve(
                &config,
                &config.default_parts(),
                Some(&Part::new("bottom", "nappa", "white")),
            )
            .unwrap_err();
        assert_eq!(err, CustomizeError::Unsatisfiable("bottom".to_string()));
    }
}
