use devtools::content::DefinitionSource;
use devtools::{
    plan_preview, ArmMode, Cell, DefDatabase, DefFamily, Definition, DefinitionCache,
    DevToolsConfig, MessageLog, TargetEvent, TargetingAction, TargetingSession, Transition,
};
use tracing::{info, warn};

use super::commands::{CapSetting, CommandRegistry, SandboxCommand};
use super::export::{write_cache_dump, write_snapshot};
use super::world::{HostView, SandboxWorld};

/// Everything one interactive sandbox session owns: the loaded definitions,
/// the cache over them, the targeting session and the world it acts on.
pub(crate) struct Sandbox {
    registry: CommandRegistry,
    database: DefDatabase,
    cache: DefinitionCache,
    session: TargetingSession,
    messages: MessageLog,
    world: SandboxWorld,
    tick: u64,
    cursor: Option<Cell>,
}

#[derive(Debug, Default, PartialEq)]
pub(crate) struct LineOutcome {
    pub(crate) lines: Vec<String>,
    pub(crate) quit: bool,
}

impl Sandbox {
    pub(crate) fn new(
        registry: CommandRegistry,
        database: DefDatabase,
        config: &DevToolsConfig,
        world: SandboxWorld,
    ) -> Self {
        Self {
            registry,
            database,
            cache: DefinitionCache::new(config.cache),
            session: TargetingSession::new(),
            messages: MessageLog::new(config.message_log_capacity),
            world,
            tick: 0,
            cursor: None,
        }
    }

    pub(crate) fn session(&self) -> &TargetingSession {
        &self.session
    }

    pub(crate) fn world(&self) -> &SandboxWorld {
        &self.world
    }

    /// Parses and runs one console line. Status messages raised while
    /// running it are appended after the command's own output.
    pub(crate) fn run_line(&mut self, raw_line: &str) -> LineOutcome {
        let command = match self.registry.parse_line(raw_line) {
            Ok(Some(command)) => command,
            Ok(None) => return LineOutcome::default(),
            Err(error) => {
                return LineOutcome {
                    lines: vec![error],
                    quit: false,
                }
            }
        };

        let pushed_before = self.messages.total_pushed();
        let quit = command == SandboxCommand::Quit;
        let mut lines = self.execute(command);

        let fresh = (self.messages.total_pushed() - pushed_before) as usize;
        let skip = self.messages.len().saturating_sub(fresh);
        lines.extend(self.messages.iter().skip(skip).map(|message| format!("> {message}")));

        LineOutcome { lines, quit }
    }

    fn execute(&mut self, command: SandboxCommand) -> Vec<String> {
        match command {
            SandboxCommand::Help => self.registry.help_lines(),
            SandboxCommand::Quit => Vec::new(),
            SandboxCommand::Tick { ticks } => {
                self.tick = self.tick.saturating_add(ticks);
                vec![format!("tick = {}", self.tick)]
            }
            SandboxCommand::Refresh => {
                self.cache.clear();
                self.cache.refresh_all(&self.database, self.tick);
                DefFamily::ALL
                    .iter()
                    .map(|family| {
                        format!(
                            "{}: {} categories",
                            family,
                            self.cache.cached_categories(*family).len()
                        )
                    })
                    .collect()
            }
            SandboxCommand::ClearCache => {
                self.cache.clear();
                vec!["cache cleared".to_string()]
            }
            SandboxCommand::Cap { setting } => {
                match setting {
                    CapSetting::Value(cap) => self.cache.set_display_cap(cap),
                    CapSetting::On => self.cache.set_limit_enabled(true),
                    CapSetting::Off => self.cache.set_limit_enabled(false),
                }
                let settings = self.cache.settings();
                vec![format!(
                    "display cap = {} ({})",
                    settings.display_cap,
                    if settings.limit_enabled { "on" } else { "off" }
                )]
            }
            SandboxCommand::Categories { family } => {
                let categories = self.cache.categories(&self.database, self.tick, family);
                if categories.is_empty() {
                    vec![format!("no {family} categories")]
                } else {
                    categories.to_vec()
                }
            }
            SandboxCommand::List {
                family,
                category,
                all,
            } => self.list(family, &category, all),
            SandboxCommand::Packs => {
                self.ensure_cache();
                self.cache.pack_names().to_vec()
            }
            SandboxCommand::Pack { pack, flat } => self.pack(&pack, flat),
            SandboxCommand::Explode {
                damage_kind,
                radius,
                damage,
                mode,
            } => self.arm(
                TargetingAction::Explode {
                    damage_kind,
                    radius,
                    damage,
                },
                mode,
            ),
            SandboxCommand::Paint {
                terrain_def,
                radius,
                mode,
            } => match self.require_definition(&terrain_def, "terrain", |def| {
                def.as_terrain().is_some()
            }) {
                Some(error) => vec![error],
                None => self.arm(
                    TargetingAction::PaintTerrain {
                        terrain_def,
                        radius,
                    },
                    mode,
                ),
            },
            SandboxCommand::Spawn { kind_def, mode } => {
                match self.require_definition(&kind_def, "creature kind", |def| {
                    def.as_pawn_kind().is_some()
                }) {
                    Some(error) => vec![error],
                    None => self.arm(TargetingAction::SpawnPawn { kind_def }, mode),
                }
            }
            SandboxCommand::Area { purpose } => {
                self.arm(TargetingAction::SelectArea { purpose }, ArmMode::Repeat)
            }
            SandboxCommand::Feed { mode } => self.arm(TargetingAction::FeedPawn, mode),
            SandboxCommand::Tame { mode } => self.arm(TargetingAction::TameAnimal, mode),
            SandboxCommand::Click { cells } => {
                self.cursor = cells.last().copied().or(self.cursor);
                self.feed_events(cells.into_iter().map(TargetEvent::Cell).collect())
            }
            SandboxCommand::Thing { thing_id } => {
                // An id that resolves to nothing is a failed resolution.
                let event = self
                    .world
                    .thing(thing_id)
                    .map(|thing| TargetEvent::Thing(thing.as_target()))
                    .unwrap_or(TargetEvent::Cancel);
                self.feed_events(vec![event])
            }
            SandboxCommand::Cancel => self.feed_events(vec![TargetEvent::Cancel]),
            SandboxCommand::Cursor { cell } => {
                self.cursor = Some(cell);
                self.describe_preview()
            }
            SandboxCommand::Release => match self.session.release_definition() {
                Some(def_name) => vec![format!("released {def_name}")],
                None => vec!["no definition is bound".to_string()],
            },
            SandboxCommand::Forget { def_name } => match self.database.remove(&def_name) {
                Some(def) => {
                    info!(def_name = %def.def_name, "definition_forgotten");
                    vec![format!("removed {}", def.def_name)]
                }
                None => vec![format!("error: unknown definition '{def_name}'")],
            },
            SandboxCommand::Unload => {
                if self.world.unload_map() {
                    vec!["map unloaded".to_string()]
                } else {
                    vec!["no map is loaded".to_string()]
                }
            }
            SandboxCommand::Map { width, height } => {
                self.world.load_map(width, height);
                vec![format!("loaded empty {width}x{height} map")]
            }
            SandboxCommand::Things => {
                let lines = self
                    .world
                    .things()
                    .map(|thing| {
                        format!(
                            "#{} {} ({}) at {} hp={}",
                            thing.id, thing.def_name, thing.label, thing.cell, thing.hit_points
                        )
                    })
                    .collect::<Vec<_>>();
                if lines.is_empty() {
                    vec!["no things".to_string()]
                } else {
                    lines
                }
            }
            SandboxCommand::Messages { count } => {
                let skip = self.messages.len().saturating_sub(count);
                self.messages
                    .iter()
                    .skip(skip)
                    .map(ToString::to_string)
                    .collect()
            }
            SandboxCommand::Snapshot { path } => {
                let plan = plan_preview(self.session.preview(), self.cursor, &self.world);
                match write_snapshot(&path, &self.world, plan.as_ref()) {
                    Ok((width, height)) => {
                        vec![format!("wrote {width}x{height} snapshot to {}", path.display())]
                    }
                    Err(error) => {
                        warn!(path = %path.display(), error = %error, "snapshot_failed");
                        vec![format!("error: {error}")]
                    }
                }
            }
            SandboxCommand::Dump { path } => {
                self.ensure_cache();
                match write_cache_dump(&path, &self.cache.snapshot()) {
                    Ok(()) => vec![format!("wrote cache dump to {}", path.display())],
                    Err(error) => {
                        warn!(path = %path.display(), error = %error, "cache_dump_failed");
                        vec![format!("error: {error}")]
                    }
                }
            }
        }
    }

    fn ensure_cache(&mut self) {
        if self.cache.is_expired(self.tick) {
            self.cache.refresh_all(&self.database, self.tick);
        }
    }

    fn list(&mut self, family: DefFamily, category: &str, all: bool) -> Vec<String> {
        let total = self
            .cache
            .by_category(&self.database, self.tick, family, category, false)
            .len();
        let shown = self
            .cache
            .by_category(&self.database, self.tick, family, category, !all);
        if shown.is_empty() {
            return vec![format!("no {family} definitions in '{category}'")];
        }

        let mut lines = shown
            .iter()
            .map(|def| format!("{} - {} [{}]", def.def_name, def.display_label(), def.pack_key()))
            .collect::<Vec<_>>();
        if lines.len() < total {
            lines.push(format!(
                "showing {} of {total}; use --all for the full list",
                lines.len()
            ));
        }
        lines
    }

    fn pack(&mut self, pack: &str, flat: bool) -> Vec<String> {
        self.ensure_cache();
        let lines = if flat {
            self.cache
                .mod_flat(pack)
                .iter()
                .map(|def| format!("{} - {}", def.def_name, def.display_label()))
                .collect::<Vec<_>>()
        } else {
            self.cache
                .mod_categories(pack)
                .flat_map(|(category, defs)| {
                    std::iter::once(format!("{category}:"))
                        .chain(defs.iter().map(|def| format!("  {}", def.def_name)))
                })
                .collect::<Vec<_>>()
        };
        if lines.is_empty() {
            vec![format!("no items from pack '{pack}'")]
        } else {
            lines
        }
    }

    fn require_definition(
        &self,
        def_name: &str,
        wanted: &str,
        accepts: fn(&Definition) -> bool,
    ) -> Option<String> {
        match self.database.definition_by_name(def_name) {
            Some(def) if accepts(&def) => None,
            Some(_) => Some(format!("error: '{def_name}' is not a {wanted} definition")),
            None => Some(format!("error: unknown definition '{def_name}'")),
        }
    }

    fn arm(&mut self, action: TargetingAction, mode: ArmMode) -> Vec<String> {
        self.session.begin(action, mode, &mut self.messages);
        Vec::new()
    }

    fn feed_events(&mut self, events: Vec<TargetEvent>) -> Vec<String> {
        if !self.session.is_active() {
            return vec!["no targeting session is active".to_string()];
        }
        let queued = events.len();
        let mut events = events.into_iter();
        let mut host = HostView {
            world: &mut self.world,
            defs: &self.database,
        };
        let transitions = self.session.pump(&mut events, &mut host, &mut self.messages);

        let mut lines = transitions
            .iter()
            .filter(|transition| **transition == Transition::Skipped)
            .map(|_| "skipped: bound definition is no longer available".to_string())
            .collect::<Vec<_>>();
        if transitions.len() < queued {
            lines.push(format!(
                "{} clicks ignored after targeting stopped",
                queued - transitions.len()
            ));
        }
        lines
    }

    fn describe_preview(&self) -> Vec<String> {
        let Some(plan) = plan_preview(self.session.preview(), self.cursor, &self.world) else {
            return vec!["no preview".to_string()];
        };
        let mut lines = vec![format!(
            "preview: {} rings, {} highlighted cells{}",
            plan.rings.len(),
            plan.highlighted.len(),
            plan.crosshair
                .map(|cell| format!(", crosshair at {cell}"))
                .unwrap_or_default()
        )];
        lines.extend(plan.labels);
        lines
    }
}

#[cfg(test)]
mod tests {
    use devtools::content::{
        DefKind, Definition, PawnKindProps, RaceProps, SourcePack, TerrainProps, ThingCategory,
        ThingFlags, ThingProps,
    };
    use tempfile::TempDir;

    use super::*;
    use crate::app::world::ThingKind;

    fn item(def_name: &str, label: &str, flags: ThingFlags, pack: Option<&str>) -> Definition {
        Definition {
            def_name: def_name.to_string(),
            label: label.to_string(),
            source_pack: pack.map(|name| SourcePack {
                package_id: format!("test.{name}"),
                name: Some(name.to_string()),
            }),
            kind: DefKind::Thing(ThingProps {
                category: ThingCategory::Item,
                market_value: 10.0,
                flags,
                ..ThingProps::default()
            }),
        }
    }

    fn sandbox() -> Sandbox {
        let mut defs = (0..12)
            .map(|i| item(&format!("Gun_{i:02}"), &format!("gun {i:02}"), ThingFlags::WEAPON, None))
            .collect::<Vec<_>>();
        defs.push(item("Beer", "beer", ThingFlags::INGESTIBLE, Some("Brewery")));
        defs.push(Definition {
            def_name: "Sand".to_string(),
            label: "sand".to_string(),
            source_pack: None,
            kind: DefKind::Terrain(TerrainProps {
                natural: true,
                ..TerrainProps::default()
            }),
        });
        defs.push(Definition {
            def_name: "Boomalope".to_string(),
            label: "boomalope".to_string(),
            source_pack: None,
            kind: DefKind::PawnKind(PawnKindProps {
                race: Some(RaceProps::default()),
            }),
        });

        let mut config = DevToolsConfig::default();
        config.cache.display_cap = 5;
        Sandbox::new(
            CommandRegistry::with_sandbox_builtins().expect("registry"),
            DefDatabase::from_definitions(defs),
            &config,
            SandboxWorld::with_demo_population(24, 24),
        )
    }

    fn run(sandbox: &mut Sandbox, line: &str) -> Vec<String> {
        sandbox.run_line(line).lines
    }

    #[test]
    fn categories_and_capped_listing() {
        let mut sandbox = sandbox();
        assert_eq!(
            run(&mut sandbox, "categories item"),
            vec!["Food & Drugs".to_string(), "Weapons".to_string()]
        );

        let capped = run(&mut sandbox, "list item Weapons");
        assert_eq!(capped.len(), 6);
        assert_eq!(capped[0], "Gun_00 - gun 00 [Core]");
        assert_eq!(capped[5], "showing 5 of 12; use --all for the full list");
        assert_eq!(run(&mut sandbox, "list item Weapons --all").len(), 12);

        run(&mut sandbox, "cap off");
        assert_eq!(run(&mut sandbox, "list item Weapons").len(), 12);
        assert_eq!(
            run(&mut sandbox, "list item Nothing"),
            vec!["no item definitions in 'Nothing'".to_string()]
        );
    }

    #[test]
    fn packs_group_items_by_owner() {
        let mut sandbox = sandbox();
        assert_eq!(
            run(&mut sandbox, "packs"),
            vec!["Brewery".to_string(), "Core".to_string()]
        );
        assert_eq!(
            run(&mut sandbox, "pack Brewery"),
            vec!["Food & Drugs:".to_string(), "  Beer".to_string()]
        );
        assert_eq!(
            run(&mut sandbox, "pack Brewery flat"),
            vec!["Beer - beer".to_string()]
        );
        assert_eq!(
            run(&mut sandbox, "pack Nobody"),
            vec!["no items from pack 'Nobody'".to_string()]
        );
    }

    #[test]
    fn explosion_session_rearms_until_cancel() {
        let mut sandbox = sandbox();
        run(&mut sandbox, "explode Bomb 1.5 500");
        let out = run(&mut sandbox, "click 4 6 2 2");
        assert!(out
            .iter()
            .any(|line| line.contains("Detonated Bomb at (4, 6) (radius 1.5, damage 500)")));
        assert!(sandbox.session().is_active());
        assert!(sandbox.world().things().all(|thing| thing.def_name != "Steel"));

        let out = run(&mut sandbox, "cancel");
        assert_eq!(out, vec!["> [neutral] Stopped explosion targeting.".to_string()]);
        assert!(!sandbox.session().is_active());
        assert_eq!(
            run(&mut sandbox, "click 1 1"),
            vec!["no targeting session is active".to_string()]
        );
    }

    #[test]
    fn huge_blast_radius_previews_the_whole_map() {
        let mut sandbox = sandbox();
        run(&mut sandbox, "explode Bomb 1000000 1");
        let preview = run(&mut sandbox, "cursor 1 1");
        assert_eq!(
            preview[0],
            "preview: 3 rings, 576 highlighted cells, crosshair at (1, 1)"
        );

        let out = run(&mut sandbox, "click 1 1");
        assert!(out
            .iter()
            .any(|line| line.contains("Detonated Bomb at (1, 1)")));
        assert!(sandbox.session().is_active());
    }

    #[test]
    fn area_selection_previews_then_applies_once() {
        let mut sandbox = sandbox();
        run(&mut sandbox, "area grow");
        assert_eq!(
            run(&mut sandbox, "cursor 3 3"),
            vec!["preview: 0 rings, 1 highlighted cells".to_string()]
        );

        run(&mut sandbox, "click 0 0");
        let preview = run(&mut sandbox, "cursor 9 3");
        assert!(preview.contains(&"Cells in area: 40".to_string()));
        assert!(preview.contains(&"Growable plants in area: 6".to_string()));

        let out = run(&mut sandbox, "click 9 3 1 1");
        assert!(out.iter().any(|line| line.contains("Designated grow area 10x4")));
        assert!(out.contains(&"1 clicks ignored after targeting stopped".to_string()));
        assert!(!sandbox.session().is_active());
        assert!(sandbox
            .world()
            .things()
            .all(|thing| !matches!(thing.kind, ThingKind::Plant { growth } if growth < 1.0)));
    }

    #[test]
    fn forgotten_definition_skips_painting() {
        let mut sandbox = sandbox();
        assert_eq!(
            run(&mut sandbox, "paint Boomalope 1"),
            vec!["error: 'Boomalope' is not a terrain definition".to_string()]
        );
        run(&mut sandbox, "paint Sand 1");
        run(&mut sandbox, "forget Sand");
        let out = run(&mut sandbox, "click 1 1");
        assert_eq!(
            out,
            vec!["skipped: bound definition is no longer available".to_string()]
        );
        assert!(sandbox.session().is_active());
    }

    #[test]
    fn thing_targeting_and_failed_resolution() {
        let mut sandbox = sandbox();
        let animal = sandbox
            .world()
            .things()
            .find(|thing| thing.def_name == "Muffalo")
            .expect("animal")
            .id;
        run(&mut sandbox, "tame");
        let out = run(&mut sandbox, &format!("thing {animal}"));
        assert_eq!(out, vec!["> [positive] Tamed muffalo.".to_string()]);

        let out = run(&mut sandbox, "thing 9999");
        assert_eq!(out, vec!["> [neutral] Stopped animal taming.".to_string()]);
    }

    #[test]
    fn unloaded_map_disables_preview_and_rejects_clicks() {
        let mut sandbox = sandbox();
        run(&mut sandbox, "explode Bomb 2 10");
        run(&mut sandbox, "unload");
        assert_eq!(run(&mut sandbox, "cursor 1 1"), vec!["no preview".to_string()]);

        let out = run(&mut sandbox, "click 1 1");
        assert_eq!(
            out,
            vec![
                "> [rejected] No map is loaded.".to_string(),
                "> [neutral] Stopped explosion targeting.".to_string()
            ]
        );
    }

    #[test]
    fn tick_drives_cache_expiry() {
        let mut sandbox = sandbox();
        run(&mut sandbox, "categories item");
        run(&mut sandbox, "forget Beer");
        assert_eq!(run(&mut sandbox, "categories item").len(), 2);

        run(&mut sandbox, "tick 2501");
        assert_eq!(
            run(&mut sandbox, "categories item"),
            vec!["Weapons".to_string()]
        );
    }

    #[test]
    fn snapshot_and_dump_write_files() {
        let temp = TempDir::new().expect("temp");
        let mut sandbox = sandbox();
        run(&mut sandbox, "explode Bomb 2 10");
        run(&mut sandbox, "cursor 5 5");

        let png = temp.path().join("frame.png");
        let out = run(&mut sandbox, &format!("snapshot \"{}\"", png.display()));
        assert!(out[0].starts_with("wrote 192x192 snapshot"));
        assert!(png.is_file());

        let json = temp.path().join("cache.json");
        run(&mut sandbox, &format!("dump \"{}\"", json.display()));
        assert!(json.is_file());
    }

    #[test]
    fn quit_and_parse_errors() {
        let mut sandbox = sandbox();
        assert!(sandbox.run_line("quit").quit);
        assert_eq!(
            run(&mut sandbox, "bogus"),
            vec!["error: unknown command 'bogus'. try: help".to_string()]
        );
    }
}
