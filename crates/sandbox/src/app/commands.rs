use std::collections::HashMap;
use std::path::PathBuf;

use devtools::{AreaPurpose, ArmMode, Cell, DefFamily};
use thiserror::Error;

use super::world::MAX_MAP_SIDE;

const ONCE_FLAG: &str = "once";
const ALL_FLAG: &str = "--all";

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum CapSetting {
    Value(usize),
    On,
    Off,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum SandboxCommand {
    Help,
    Quit,
    Tick { ticks: u64 },
    Refresh,
    ClearCache,
    Cap { setting: CapSetting },
    Categories { family: DefFamily },
    List {
        family: DefFamily,
        category: String,
        all: bool,
    },
    Packs,
    Pack { pack: String, flat: bool },
    Explode {
        damage_kind: String,
        radius: f32,
        damage: u32,
        mode: ArmMode,
    },
    Paint {
        terrain_def: String,
        radius: f32,
        mode: ArmMode,
    },
    Spawn { kind_def: String, mode: ArmMode },
    Area { purpose: AreaPurpose },
    Feed { mode: ArmMode },
    Tame { mode: ArmMode },
    Click { cells: Vec<Cell> },
    Thing { thing_id: u64 },
    Cancel,
    Cursor { cell: Cell },
    Release,
    Forget { def_name: String },
    Unload,
    Map { width: i32, height: i32 },
    Things,
    Messages { count: usize },
    Snapshot { path: PathBuf },
    Dump { path: PathBuf },
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct CommandParseError {
    reason: String,
    usage: String,
}

impl CommandParseError {
    fn new(reason: impl Into<String>, usage: &str) -> Self {
        Self {
            reason: reason.into(),
            usage: usage.to_string(),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub(crate) enum RegistryError {
    #[error("command name cannot be empty")]
    EmptyName,
    #[error("duplicate command registration: {name}")]
    Duplicate { name: String },
}

type ParseFn = fn(&[String]) -> Result<SandboxCommand, CommandParseError>;

struct CommandSpec {
    name: &'static str,
    help: &'static str,
    arg_schema: &'static str,
    parse: ParseFn,
}

const BUILTINS: &[(&str, &str, &str, ParseFn)] = &[
    ("help", "List commands", "", parse_help),
    ("quit", "Stop reading commands", "", parse_quit),
    ("tick", "Advance the game clock", "[ticks:u64]", parse_tick),
    ("refresh", "Rebuild the definition cache now", "", parse_refresh),
    ("clear_cache", "Drop every cache index", "", parse_clear_cache),
    ("cap", "Set the display cap or toggle it", "<n|on|off>", parse_cap),
    (
        "categories",
        "List categories of a family",
        "<family:item|building|terrain|creature>",
        parse_categories,
    ),
    (
        "list",
        "List definitions in a category",
        "<family> <category...> [--all]",
        parse_list,
    ),
    ("packs", "List content packs owning items", "", parse_packs),
    ("pack", "List one pack's items", "<pack> [flat]", parse_pack),
    (
        "explode",
        "Arm explosion targeting",
        "<kind> <radius:f32> <damage:u32> [once]",
        parse_explode,
    ),
    (
        "paint",
        "Arm terrain painting",
        "<terrain_def> <radius:f32> [once]",
        parse_paint,
    ),
    ("spawn", "Arm pawn spawning", "<kind_def> [once]", parse_spawn),
    (
        "area",
        "Arm two-corner area selection",
        "<purpose:grow|clear>",
        parse_area,
    ),
    ("feed", "Arm pawn feeding", "[once]", parse_feed),
    ("tame", "Arm animal taming", "[once]", parse_tame),
    (
        "click",
        "Resolve one or more cell clicks this frame",
        "<x:i32> <z:i32> [x z ...]",
        parse_click,
    ),
    ("thing", "Click a thing by id", "<thing_id:u64>", parse_thing),
    ("cancel", "Right-click: stop targeting", "", parse_cancel),
    ("cursor", "Move the cursor and describe the preview", "<x:i32> <z:i32>", parse_cursor),
    ("release", "Drop the armed definition", "", parse_release),
    ("forget", "Remove a definition from the database", "<def_name>", parse_forget),
    ("unload", "Unload the current map", "", parse_unload),
    ("map", "Load an empty map", "<width:i32> <height:i32>", parse_map),
    ("things", "List things on the map", "", parse_things),
    ("messages", "Show recent status messages", "[count:usize]", parse_messages),
    ("snapshot", "Render the map and preview to PNG", "<path>", parse_snapshot),
    ("dump", "Write the cache contents as JSON", "<path>", parse_dump),
];

pub(crate) struct CommandRegistry {
    specs: Vec<CommandSpec>,
    lookup_by_lower_name: HashMap<String, usize>,
}

impl CommandRegistry {
    pub(crate) fn new() -> Self {
        Self {
            specs: Vec::new(),
            lookup_by_lower_name: HashMap::new(),
        }
    }

    pub(crate) fn with_sandbox_builtins() -> Result<Self, RegistryError> {
        let mut registry = Self::new();
        for &(name, help, arg_schema, parse) in BUILTINS {
            registry.register(name, help, arg_schema, parse)?;
        }
        Ok(registry)
    }

    pub(crate) fn register(
        &mut self,
        name: &'static str,
        help: &'static str,
        arg_schema: &'static str,
        parse: ParseFn,
    ) -> Result<(), RegistryError> {
        if name.trim().is_empty() {
            return Err(RegistryError::EmptyName);
        }
        let lower = name.to_ascii_lowercase();
        if self.lookup_by_lower_name.contains_key(&lower) {
            return Err(RegistryError::Duplicate {
                name: name.to_string(),
            });
        }

        self.specs.push(CommandSpec {
            name,
            help,
            arg_schema,
            parse,
        });
        self.lookup_by_lower_name
            .insert(lower, self.specs.len() - 1);
        Ok(())
    }

    fn lookup(&self, input_name: &str) -> Option<&CommandSpec> {
        let index = self
            .lookup_by_lower_name
            .get(&input_name.to_ascii_lowercase())?;
        self.specs.get(*index)
    }

    /// One line per command, in registration order.
    pub(crate) fn help_lines(&self) -> Vec<String> {
        self.specs
            .iter()
            .map(|spec| {
                if spec.arg_schema.is_empty() {
                    format!("{} - {}", spec.name, spec.help)
                } else {
                    format!("{} {} - {}", spec.name, spec.arg_schema, spec.help)
                }
            })
            .collect()
    }

    /// `Ok(None)` for blank lines and `#` comments. Errors are ready to print.
    pub(crate) fn parse_line(&self, raw_line: &str) -> Result<Option<SandboxCommand>, String> {
        let trimmed = raw_line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            return Ok(None);
        }

        let tokens =
            tokenize_line(trimmed).map_err(|reason| format!("error: {reason}. usage: help"))?;
        let Some((command_name, args)) = tokens.split_first() else {
            return Ok(None);
        };
        let Some(spec) = self.lookup(command_name) else {
            return Err(format!(
                "error: unknown command '{command_name}'. try: help"
            ));
        };

        (spec.parse)(args)
            .map(Some)
            .map_err(|error| format!("error: {}. usage: {}", error.reason, error.usage))
    }
}

fn tokenize_line(line: &str) -> Result<Vec<String>, String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut seen_token_content = false;

    for ch in line.chars() {
        match ch {
            '"' => {
                in_quotes = !in_quotes;
                seen_token_content = true;
            }
            c if c.is_whitespace() && !in_quotes => {
                if seen_token_content {
                    tokens.push(std::mem::take(&mut current));
                    seen_token_content = false;
                }
            }
            _ => {
                current.push(ch);
                seen_token_content = true;
            }
        }
    }

    if in_quotes {
        return Err("unterminated quoted string".to_string());
    }
    if seen_token_content {
        tokens.push(current);
    }
    Ok(tokens)
}

fn parse_help(args: &[String]) -> Result<SandboxCommand, CommandParseError> {
    require_no_args(args, "help")?;
    Ok(SandboxCommand::Help)
}

fn parse_quit(args: &[String]) -> Result<SandboxCommand, CommandParseError> {
    require_no_args(args, "quit")?;
    Ok(SandboxCommand::Quit)
}

fn parse_tick(args: &[String]) -> Result<SandboxCommand, CommandParseError> {
    const USAGE: &str = "tick [ticks]";
    let ticks = match args {
        [] => 1,
        [raw] => parse_number::<u64>(raw, "ticks", USAGE)?,
        _ => return Err(CommandParseError::new("expected at most one argument", USAGE)),
    };
    Ok(SandboxCommand::Tick { ticks })
}

fn parse_refresh(args: &[String]) -> Result<SandboxCommand, CommandParseError> {
    require_no_args(args, "refresh")?;
    Ok(SandboxCommand::Refresh)
}

fn parse_clear_cache(args: &[String]) -> Result<SandboxCommand, CommandParseError> {
    require_no_args(args, "clear_cache")?;
    Ok(SandboxCommand::ClearCache)
}

fn parse_cap(args: &[String]) -> Result<SandboxCommand, CommandParseError> {
    const USAGE: &str = "cap <n|on|off>";
    let [raw] = args else {
        return Err(CommandParseError::new("expected exactly one argument", USAGE));
    };
    let setting = match raw.to_ascii_lowercase().as_str() {
        "on" => CapSetting::On,
        "off" => CapSetting::Off,
        _ => {
            let value = parse_number::<usize>(raw, "cap", USAGE)?;
            if value == 0 {
                return Err(CommandParseError::new("cap must be positive", USAGE));
            }
            CapSetting::Value(value)
        }
    };
    Ok(SandboxCommand::Cap { setting })
}

fn parse_categories(args: &[String]) -> Result<SandboxCommand, CommandParseError> {
    const USAGE: &str = "categories <family>";
    let [raw] = args else {
        return Err(CommandParseError::new("expected exactly one argument <family>", USAGE));
    };
    Ok(SandboxCommand::Categories {
        family: parse_family(raw, USAGE)?,
    })
}

fn parse_list(args: &[String]) -> Result<SandboxCommand, CommandParseError> {
    const USAGE: &str = "list <family> <category...> [--all]";
    let Some((family, rest)) = args.split_first() else {
        return Err(CommandParseError::new("missing required argument <family>", USAGE));
    };
    let family = parse_family(family, USAGE)?;
    let all = rest.iter().any(|arg| arg == ALL_FLAG);
    let category = rest
        .iter()
        .filter(|arg| *arg != ALL_FLAG)
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(" ");
    if category.is_empty() {
        return Err(CommandParseError::new("missing required argument <category>", USAGE));
    }
    Ok(SandboxCommand::List {
        family,
        category,
        all,
    })
}

fn parse_packs(args: &[String]) -> Result<SandboxCommand, CommandParseError> {
    require_no_args(args, "packs")?;
    Ok(SandboxCommand::Packs)
}

fn parse_pack(args: &[String]) -> Result<SandboxCommand, CommandParseError> {
    const USAGE: &str = "pack <pack> [flat]";
    match args {
        [pack] => Ok(SandboxCommand::Pack {
            pack: pack.clone(),
            flat: false,
        }),
        [pack, flag] if flag.eq_ignore_ascii_case("flat") => Ok(SandboxCommand::Pack {
            pack: pack.clone(),
            flat: true,
        }),
        _ => Err(CommandParseError::new("expected <pack> or <pack> flat", USAGE)),
    }
}

fn parse_explode(args: &[String]) -> Result<SandboxCommand, CommandParseError> {
    const USAGE: &str = "explode <kind> <radius> <damage> [once]";
    let (args, mode) = split_arm_mode(args);
    let [kind, radius, damage] = args else {
        return Err(CommandParseError::new(
            "expected <kind> <radius> <damage>",
            USAGE,
        ));
    };
    Ok(SandboxCommand::Explode {
        damage_kind: kind.clone(),
        radius: parse_radius(radius, USAGE)?,
        damage: parse_number::<u32>(damage, "damage", USAGE)?,
        mode,
    })
}

fn parse_paint(args: &[String]) -> Result<SandboxCommand, CommandParseError> {
    const USAGE: &str = "paint <terrain_def> <radius> [once]";
    let (args, mode) = split_arm_mode(args);
    let [terrain_def, radius] = args else {
        return Err(CommandParseError::new(
            "expected <terrain_def> <radius>",
            USAGE,
        ));
    };
    Ok(SandboxCommand::Paint {
        terrain_def: terrain_def.clone(),
        radius: parse_radius(radius, USAGE)?,
        mode,
    })
}

fn parse_spawn(args: &[String]) -> Result<SandboxCommand, CommandParseError> {
    const USAGE: &str = "spawn <kind_def> [once]";
    let (args, mode) = split_arm_mode(args);
    let [kind_def] = args else {
        return Err(CommandParseError::new("expected exactly one <kind_def>", USAGE));
    };
    Ok(SandboxCommand::Spawn {
        kind_def: kind_def.clone(),
        mode,
    })
}

fn parse_area(args: &[String]) -> Result<SandboxCommand, CommandParseError> {
    const USAGE: &str = "area <grow|clear>";
    let [raw] = args else {
        return Err(CommandParseError::new("expected exactly one <purpose>", USAGE));
    };
    let purpose = AreaPurpose::parse(raw).ok_or_else(|| {
        CommandParseError::new(format!("unknown purpose '{raw}' (expected grow|clear)"), USAGE)
    })?;
    Ok(SandboxCommand::Area { purpose })
}

fn parse_feed(args: &[String]) -> Result<SandboxCommand, CommandParseError> {
    let (args, mode) = split_arm_mode(args);
    require_no_args(args, "feed [once]")?;
    Ok(SandboxCommand::Feed { mode })
}

fn parse_tame(args: &[String]) -> Result<SandboxCommand, CommandParseError> {
    let (args, mode) = split_arm_mode(args);
    require_no_args(args, "tame [once]")?;
    Ok(SandboxCommand::Tame { mode })
}

fn parse_click(args: &[String]) -> Result<SandboxCommand, CommandParseError> {
    const USAGE: &str = "click <x> <z> [x z ...]";
    if args.is_empty() || args.len() % 2 != 0 {
        return Err(CommandParseError::new(
            "expected one or more <x> <z> pairs",
            USAGE,
        ));
    }
    let cells = args
        .chunks(2)
        .map(|pair| parse_cell(&pair[0], &pair[1], USAGE))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(SandboxCommand::Click { cells })
}

fn parse_thing(args: &[String]) -> Result<SandboxCommand, CommandParseError> {
    const USAGE: &str = "thing <thing_id>";
    let [raw] = args else {
        return Err(CommandParseError::new("expected exactly one <thing_id>", USAGE));
    };
    Ok(SandboxCommand::Thing {
        thing_id: parse_number::<u64>(raw, "thing id", USAGE)?,
    })
}

fn parse_cancel(args: &[String]) -> Result<SandboxCommand, CommandParseError> {
    require_no_args(args, "cancel")?;
    Ok(SandboxCommand::Cancel)
}

fn parse_cursor(args: &[String]) -> Result<SandboxCommand, CommandParseError> {
    const USAGE: &str = "cursor <x> <z>";
    let [x, z] = args else {
        return Err(CommandParseError::new("expected <x> <z>", USAGE));
    };
    Ok(SandboxCommand::Cursor {
        cell: parse_cell(x, z, USAGE)?,
    })
}

fn parse_release(args: &[String]) -> Result<SandboxCommand, CommandParseError> {
    require_no_args(args, "release")?;
    Ok(SandboxCommand::Release)
}

fn parse_forget(args: &[String]) -> Result<SandboxCommand, CommandParseError> {
    let [def_name] = args else {
        return Err(CommandParseError::new(
            "expected exactly one <def_name>",
            "forget <def_name>",
        ));
    };
    Ok(SandboxCommand::Forget {
        def_name: def_name.clone(),
    })
}

fn parse_unload(args: &[String]) -> Result<SandboxCommand, CommandParseError> {
    require_no_args(args, "unload")?;
    Ok(SandboxCommand::Unload)
}

fn parse_map(args: &[String]) -> Result<SandboxCommand, CommandParseError> {
    const USAGE: &str = "map <width> <height>";
    let [width, height] = args else {
        return Err(CommandParseError::new("expected <width> <height>", USAGE));
    };
    let width = parse_number::<i32>(width, "width", USAGE)?;
    let height = parse_number::<i32>(height, "height", USAGE)?;
    let side = 1..=MAX_MAP_SIDE;
    if !side.contains(&width) || !side.contains(&height) {
        return Err(CommandParseError::new(
            format!("map size must be between 1 and {MAX_MAP_SIDE}"),
            USAGE,
        ));
    }
    Ok(SandboxCommand::Map { width, height })
}

fn parse_things(args: &[String]) -> Result<SandboxCommand, CommandParseError> {
    require_no_args(args, "things")?;
    Ok(SandboxCommand::Things)
}

fn parse_messages(args: &[String]) -> Result<SandboxCommand, CommandParseError> {
    const USAGE: &str = "messages [count]";
    let count = match args {
        [] => 10,
        [raw] => parse_number::<usize>(raw, "count", USAGE)?,
        _ => return Err(CommandParseError::new("expected at most one argument", USAGE)),
    };
    Ok(SandboxCommand::Messages { count })
}

fn parse_snapshot(args: &[String]) -> Result<SandboxCommand, CommandParseError> {
    let [path] = args else {
        return Err(CommandParseError::new(
            "expected exactly one <path>",
            "snapshot <path>",
        ));
    };
    Ok(SandboxCommand::Snapshot {
        path: PathBuf::from(path),
    })
}

fn parse_dump(args: &[String]) -> Result<SandboxCommand, CommandParseError> {
    let [path] = args else {
        return Err(CommandParseError::new(
            "expected exactly one <path>",
            "dump <path>",
        ));
    };
    Ok(SandboxCommand::Dump {
        path: PathBuf::from(path),
    })
}

fn split_arm_mode(args: &[String]) -> (&[String], ArmMode) {
    match args.split_last() {
        Some((last, rest)) if last.eq_ignore_ascii_case(ONCE_FLAG) => (rest, ArmMode::Once),
        _ => (args, ArmMode::Repeat),
    }
}

fn parse_family(raw: &str, usage: &str) -> Result<DefFamily, CommandParseError> {
    DefFamily::parse(raw).ok_or_else(|| {
        CommandParseError::new(
            format!("unknown family '{raw}' (expected item|building|terrain|creature)"),
            usage,
        )
    })
}

fn parse_number<T: std::str::FromStr>(
    raw: &str,
    what: &str,
    usage: &str,
) -> Result<T, CommandParseError> {
    raw.parse::<T>().map_err(|_| {
        CommandParseError::new(
            format!("invalid {what} '{raw}' (expected {})", std::any::type_name::<T>()),
            usage,
        )
    })
}

fn parse_radius(raw: &str, usage: &str) -> Result<f32, CommandParseError> {
    let radius = parse_number::<f32>(raw, "radius", usage)?;
    if !radius.is_finite() || radius < 0.0 {
        return Err(CommandParseError::new(
            format!("radius must be a non-negative number, got '{raw}'"),
            usage,
        ));
    }
    Ok(radius)
}

fn parse_cell(x: &str, z: &str, usage: &str) -> Result<Cell, CommandParseError> {
    Ok(Cell::new(
        parse_number::<i32>(x, "x coordinate", usage)?,
        parse_number::<i32>(z, "z coordinate", usage)?,
    ))
}

fn require_no_args(args: &[String], usage: &str) -> Result<(), CommandParseError> {
    if args.is_empty() {
        Ok(())
    } else {
        Err(CommandParseError::new("unexpected extra arguments", usage))
    }
}
