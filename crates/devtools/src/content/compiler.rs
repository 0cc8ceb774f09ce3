use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use roxmltree::{Document, Node};
use tracing::info;

use crate::AppPaths;

use super::database::DefDatabase;
use super::discovery::{discover_pack_sources, ContentLoadRequest, DiscoveryError, PackSource};
use super::types::{
    DefKind, Definition, Intelligence, PawnKindProps, RaceProps, TechLevel, TerrainProps,
    ThingCategory, ThingFlags, ThingProps,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceLocation {
    pub line: usize,
    pub column: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentErrorCode {
    Discovery,
    ReadFile,
    XmlMalformed,
    InvalidRoot,
    UnknownDefType,
    UnknownField,
    DuplicateField,
    MissingField,
    InvalidValue,
    DuplicateDefInPack,
}

#[derive(Debug, Clone)]
pub struct ContentLoadError {
    pub code: ContentErrorCode,
    pub message: String,
    pub pack_id: String,
    pub file_path: PathBuf,
    pub location: Option<SourceLocation>,
}

impl fmt::Display for ContentLoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.location {
            Some(loc) => write!(
                f,
                "{:?}: {} (pack={}, file={}, line={}, column={})",
                self.code,
                self.message,
                self.pack_id,
                self.file_path.display(),
                loc.line,
                loc.column
            ),
            None => write!(
                f,
                "{:?}: {} (pack={}, file={})",
                self.code,
                self.message,
                self.pack_id,
                self.file_path.display()
            ),
        }
    }
}

impl std::error::Error for ContentLoadError {}

/// Loads every pack's `Defs/**/*.xml` into one database. Within a pack a
/// `defName` may appear once; a later pack redefining it takes ownership.
pub fn load_def_database(
    app_paths: &AppPaths,
    request: &ContentLoadRequest,
) -> Result<DefDatabase, ContentLoadError> {
    let sources = discover_pack_sources(app_paths, request)
        .map_err(|error| map_discovery_error(error, &app_paths.root))?;

    let mut database = DefDatabase::default();
    for source in &sources {
        let defs = load_pack_defs(source)?;
        info!(
            pack = %source.dir_name,
            load_index = source.load_index,
            def_count = defs.len(),
            "content_pack_loaded"
        );
        for def in defs {
            database.insert(def);
        }
    }

    Ok(database)
}

fn load_pack_defs(source: &PackSource) -> Result<Vec<Definition>, ContentLoadError> {
    if !source.defs_dir.is_dir() {
        return Ok(Vec::new());
    }
    let xml_files = collect_xml_files_sorted(&source.defs_dir)
        .map_err(|error| read_error(&source.dir_name, error.path, error.source))?;

    let mut seen_in_pack = HashSet::<String>::new();
    let mut defs = Vec::new();
    for xml_file in xml_files {
        let raw = fs::read_to_string(&xml_file)
            .map_err(|source_err| read_error(&source.dir_name, xml_file.clone(), source_err))?;
        let ctx = ParseContext {
            pack_id: &source.dir_name,
            file_path: &xml_file,
        };
        for mut def in parse_defs_document(&ctx, &raw)? {
            if !seen_in_pack.insert(def.def_name.clone()) {
                return Err(ContentLoadError {
                    code: ContentErrorCode::DuplicateDefInPack,
                    message: format!(
                        "duplicate def '{}' in pack '{}'; each pack may define a defName only once",
                        def.def_name, source.dir_name
                    ),
                    pack_id: source.dir_name.clone(),
                    file_path: xml_file.clone(),
                    location: None,
                });
            }
            def.source_pack = source.pack.clone();
            defs.push(def);
        }
    }
    Ok(defs)
}

struct ParseContext<'a> {
    pack_id: &'a str,
    file_path: &'a Path,
}

impl ParseContext<'_> {
    fn error_at(
        &self,
        code: ContentErrorCode,
        message: String,
        doc: &Document<'_>,
        node: Node<'_, '_>,
    ) -> ContentLoadError {
        let pos = doc.text_pos_at(node.range().start);
        ContentLoadError {
            code,
            message,
            pack_id: self.pack_id.to_string(),
            file_path: self.file_path.to_path_buf(),
            location: Some(SourceLocation {
                line: pos.row as usize,
                column: pos.col as usize,
            }),
        }
    }
}

fn parse_defs_document(ctx: &ParseContext<'_>, raw: &str) -> Result<Vec<Definition>, ContentLoadError> {
    let doc = Document::parse(raw).map_err(|error| ContentLoadError {
        code: ContentErrorCode::XmlMalformed,
        message: format!("malformed XML: {error}"),
        pack_id: ctx.pack_id.to_string(),
        file_path: ctx.file_path.to_path_buf(),
        location: Some(SourceLocation {
            line: error.pos().row as usize,
            column: error.pos().col as usize,
        }),
    })?;

    let root = doc.root_element();
    if root.tag_name().name() != "Defs" {
        return Err(ctx.error_at(
            ContentErrorCode::InvalidRoot,
            "root element must be <Defs>".to_string(),
            &doc,
            root,
        ));
    }

    let mut defs = Vec::new();
    for child in root.children().filter(|node| node.is_element()) {
        let def_type = child.tag_name().name();
        let fields = collect_fields(ctx, &doc, child)?;
        let kind = match def_type {
            "ThingDef" => DefKind::Thing(parse_thing_props(ctx, &doc, &fields)?),
            "TerrainDef" => DefKind::Terrain(parse_terrain_props(ctx, &doc, &fields)?),
            "PawnKindDef" => DefKind::PawnKind(parse_pawn_kind_props(ctx, &doc, &fields)?),
            other => {
                return Err(ctx.error_at(
                    ContentErrorCode::UnknownDefType,
                    format!(
                        "unsupported def type <{other}>; expected ThingDef, TerrainDef or PawnKindDef"
                    ),
                    &doc,
                    child,
                ))
            }
        };
        let Some(def_name_node) = fields.get("defName") else {
            return Err(ctx.error_at(
                ContentErrorCode::MissingField,
                format!("missing required field <defName> in <{def_type}>"),
                &doc,
                child,
            ));
        };
        let def_name = required_text(ctx, &doc, *def_name_node, "defName")?;
        let label = fields
            .get("label")
            .and_then(|node| node.text())
            .map(str::trim)
            .unwrap_or_default()
            .to_string();

        defs.push(Definition {
            def_name,
            label,
            source_pack: None,
            kind,
        });
    }

    Ok(defs)
}

type Fields<'a, 'input> = BTreeMap<&'a str, Node<'a, 'input>>;

const THING_FIELDS: &[&str] = &[
    "defName",
    "label",
    "category",
    "marketValue",
    "techLevel",
    "flags",
    "designationCategory",
];
const TERRAIN_FIELDS: &[&str] = &[
    "defName",
    "label",
    "designationCategory",
    "buildable",
    "natural",
    "water",
];
const PAWN_KIND_FIELDS: &[&str] = &["defName", "label", "race"];
const RACE_FIELDS: &[&str] = &["intelligence", "mechanoid", "insect"];

/// Child elements by tag name, rejecting duplicates and unknown names.
fn collect_fields<'a, 'input>(
    ctx: &ParseContext<'_>,
    doc: &Document<'_>,
    node: Node<'a, 'input>,
) -> Result<Fields<'a, 'input>, ContentLoadError> {
    let allowed = match node.tag_name().name() {
        "ThingDef" => THING_FIELDS,
        "TerrainDef" => TERRAIN_FIELDS,
        "PawnKindDef" => PAWN_KIND_FIELDS,
        "race" => RACE_FIELDS,
        _ => return Ok(Fields::new()),
    };

    let mut fields = Fields::new();
    for field in node.children().filter(|child| child.is_element()) {
        let name = field.tag_name().name();
        if !allowed.contains(&name) {
            return Err(ctx.error_at(
                ContentErrorCode::UnknownField,
                format!("unknown field <{name}> in <{}>", node.tag_name().name()),
                doc,
                field,
            ));
        }
        if fields.insert(name, field).is_some() {
            return Err(ctx.error_at(
                ContentErrorCode::DuplicateField,
                format!("duplicate field <{name}> in <{}>", node.tag_name().name()),
                doc,
                field,
            ));
        }
    }
    Ok(fields)
}

fn parse_thing_props(
    ctx: &ParseContext<'_>,
    doc: &Document<'_>,
    fields: &Fields<'_, '_>,
) -> Result<ThingProps, ContentLoadError> {
    let mut props = ThingProps::default();

    if let Some(node) = fields.get("category") {
        let value = required_text(ctx, doc, *node, "category")?;
        props.category = match value.as_str() {
            "Item" => ThingCategory::Item,
            "Building" => ThingCategory::Building,
            "Plant" => ThingCategory::Plant,
            "Pawn" => ThingCategory::Pawn,
            "Other" => ThingCategory::Other,
            _ => {
                return Err(invalid_value(
                    ctx,
                    doc,
                    *node,
                    format!("invalid category '{value}'; allowed values: Item, Building, Plant, Pawn, Other"),
                ))
            }
        };
    }
    if let Some(node) = fields.get("marketValue") {
        let value = parse_f32(ctx, doc, *node, "marketValue")?;
        if value < 0.0 {
            return Err(invalid_value(
                ctx,
                doc,
                *node,
                "marketValue must be >= 0".to_string(),
            ));
        }
        props.market_value = value;
    }
    if let Some(node) = fields.get("techLevel") {
        let value = required_text(ctx, doc, *node, "techLevel")?;
        props.tech_level = match value.as_str() {
            "Undefined" => TechLevel::Undefined,
            "Neolithic" => TechLevel::Neolithic,
            "Medieval" => TechLevel::Medieval,
            "Industrial" => TechLevel::Industrial,
            "Spacer" => TechLevel::Spacer,
            "Ultra" => TechLevel::Ultra,
            "Archotech" => TechLevel::Archotech,
            _ => {
                return Err(invalid_value(
                    ctx,
                    doc,
                    *node,
                    format!("invalid techLevel '{value}'"),
                ))
            }
        };
    }
    if let Some(node) = fields.get("flags") {
        for entry in list_entries(ctx, doc, *node, "flags")? {
            let value = required_text(ctx, doc, entry, "li")?;
            let Some(flag) = ThingFlags::from_xml_name(&value) else {
                return Err(invalid_value(
                    ctx,
                    doc,
                    entry,
                    format!("unknown flag '{value}'"),
                ));
            };
            props.flags |= flag;
        }
    }
    if let Some(node) = fields.get("designationCategory") {
        props.designation_category = Some(required_text(ctx, doc, *node, "designationCategory")?);
    }

    Ok(props)
}

fn parse_terrain_props(
    ctx: &ParseContext<'_>,
    doc: &Document<'_>,
    fields: &Fields<'_, '_>,
) -> Result<TerrainProps, ContentLoadError> {
    let flag = |name: &str| -> Result<bool, ContentLoadError> {
        match fields.get(name) {
            Some(node) => parse_bool(ctx, doc, *node, name),
            None => Ok(false),
        }
    };

    Ok(TerrainProps {
        designation_category: fields
            .get("designationCategory")
            .map(|node| required_text(ctx, doc, *node, "designationCategory"))
            .transpose()?,
        buildable: flag("buildable")?,
        natural: flag("natural")?,
        water: flag("water")?,
    })
}

fn parse_pawn_kind_props(
    ctx: &ParseContext<'_>,
    doc: &Document<'_>,
    fields: &Fields<'_, '_>,
) -> Result<PawnKindProps, ContentLoadError> {
    let Some(race_node) = fields.get("race") else {
        return Ok(PawnKindProps { race: None });
    };
    let race_fields = collect_fields(ctx, doc, *race_node)?;

    let mut race = RaceProps::default();
    if let Some(node) = race_fields.get("intelligence") {
        let value = required_text(ctx, doc, *node, "intelligence")?;
        race.intelligence = match value.as_str() {
            "Animal" => Intelligence::Animal,
            "ToolUser" => Intelligence::ToolUser,
            "Humanlike" => Intelligence::Humanlike,
            _ => {
                return Err(invalid_value(
                    ctx,
                    doc,
                    *node,
                    format!("invalid intelligence '{value}'; allowed values: Animal, ToolUser, Humanlike"),
                ))
            }
        };
    }
    if let Some(node) = race_fields.get("mechanoid") {
        race.mechanoid = parse_bool(ctx, doc, *node, "mechanoid")?;
    }
    if let Some(node) = race_fields.get("insect") {
        race.insect = parse_bool(ctx, doc, *node, "insect")?;
    }

    Ok(PawnKindProps { race: Some(race) })
}

fn list_entries<'a, 'input>(
    ctx: &ParseContext<'_>,
    doc: &Document<'_>,
    node: Node<'a, 'input>,
    field_name: &str,
) -> Result<Vec<Node<'a, 'input>>, ContentLoadError> {
    let mut entries = Vec::new();
    for child in node.children().filter(|child| child.is_element()) {
        if child.tag_name().name() != "li" {
            return Err(ctx.error_at(
                ContentErrorCode::UnknownField,
                format!("<{field_name}> may only contain <li> entries"),
                doc,
                child,
            ));
        }
        entries.push(child);
    }
    Ok(entries)
}

fn required_text(
    ctx: &ParseContext<'_>,
    doc: &Document<'_>,
    node: Node<'_, '_>,
    field_name: &str,
) -> Result<String, ContentLoadError> {
    let value = node.text().map(str::trim).unwrap_or_default().to_string();
    if value.is_empty() {
        return Err(ctx.error_at(
            ContentErrorCode::MissingField,
            format!("field <{field_name}> must not be empty"),
            doc,
            node,
        ));
    }
    Ok(value)
}

fn parse_bool(
    ctx: &ParseContext<'_>,
    doc: &Document<'_>,
    node: Node<'_, '_>,
    field_name: &str,
) -> Result<bool, ContentLoadError> {
    let value = required_text(ctx, doc, node, field_name)?;
    match value.to_ascii_lowercase().as_str() {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(invalid_value(
            ctx,
            doc,
            node,
            format!("{field_name} '{value}' is not true or false"),
        )),
    }
}

fn parse_f32(
    ctx: &ParseContext<'_>,
    doc: &Document<'_>,
    node: Node<'_, '_>,
    field_name: &str,
) -> Result<f32, ContentLoadError> {
    let value = required_text(ctx, doc, node, field_name)?;
    match value.parse::<f32>() {
        Ok(parsed) if parsed.is_finite() => Ok(parsed),
        _ => Err(invalid_value(
            ctx,
            doc,
            node,
            format!("{field_name} '{value}' is not a valid number"),
        )),
    }
}

fn invalid_value(
    ctx: &ParseContext<'_>,
    doc: &Document<'_>,
    node: Node<'_, '_>,
    message: String,
) -> ContentLoadError {
    ctx.error_at(ContentErrorCode::InvalidValue, message, doc, node)
}

struct ReadError {
    path: PathBuf,
    source: std::io::Error,
}

fn collect_xml_files_sorted(root: &Path) -> Result<Vec<PathBuf>, ReadError> {
    let mut files = Vec::<(String, PathBuf)>::new();
    collect_recursive(root, root, &mut files)?;
    files.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(files.into_iter().map(|(_, path)| path).collect())
}

fn collect_recursive(
    root: &Path,
    current: &Path,
    files: &mut Vec<(String, PathBuf)>,
) -> Result<(), ReadError> {
    let entries = fs::read_dir(current).map_err(|source| ReadError {
        path: current.to_path_buf(),
        source,
    })?;
    for entry in entries {
        let entry = entry.map_err(|source| ReadError {
            path: current.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        if path.is_dir() {
            collect_recursive(root, &path, files)?;
        } else if path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("xml"))
        {
            let relative = path
                .strip_prefix(root)
                .map(normalize_rel_path)
                .unwrap_or_else(|_| path.display().to_string());
            files.push((relative, path));
        }
    }
    Ok(())
}

fn normalize_rel_path(path: &Path) -> String {
    path.components()
        .map(|component| component.as_os_str().to_string_lossy().to_string())
        .collect::<Vec<_>>()
        .join("/")
}

fn read_error(pack_id: &str, path: PathBuf, source: std::io::Error) -> ContentLoadError {
    ContentLoadError {
        code: ContentErrorCode::ReadFile,
        message: format!("failed to read XML file: {source}"),
        pack_id: pack_id.to_string(),
        file_path: path,
        location: None,
    }
}

fn map_discovery_error(error: DiscoveryError, root: &Path) -> ContentLoadError {
    match error {
        DiscoveryError::EnabledPackMissing {
            pack_id,
            expected_dir,
        } => ContentLoadError {
            code: ContentErrorCode::Discovery,
            message: format!(
                "enabled pack '{}' not found at {}; check enabled pack list",
                pack_id,
                expected_dir.display()
            ),
            pack_id,
            file_path: expected_dir,
            location: None,
        },
        other => ContentLoadError {
            code: ContentErrorCode::Discovery,
            message: other.to_string(),
            pack_id: "<discovery>".to_string(),
            file_path: root.to_path_buf(),
            location: None,
        },
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;
    use crate::content::database::DefinitionSource;
    use crate::content::discovery::DEFS_DIR_NAME;
    use crate::content::types::CORE_PACK_NAME;

    fn setup_app_paths(root: &Path) -> AppPaths {
        let core = root.join("assets").join("core");
        let packs = root.join("packs");
        fs::create_dir_all(core.join(DEFS_DIR_NAME)).expect("core");
        fs::create_dir_all(&packs).expect("packs");
        AppPaths {
            root: root.to_path_buf(),
            core_content_dir: core,
            packs_dir: packs,
        }
    }

    fn write_file(path: &Path, content: &str) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("mkdir");
        }
        fs::write(path, content).expect("write");
    }

    fn core_defs(app: &AppPaths, file: &str) -> PathBuf {
        app.core_content_dir.join(DEFS_DIR_NAME).join(file)
    }

    fn request(packs: &[&str]) -> ContentLoadRequest {
        ContentLoadRequest {
            enabled_packs: packs.iter().map(ToString::to_string).collect(),
        }
    }

    #[test]
    fn parses_all_three_def_types() {
        let temp = TempDir::new().expect("temp");
        let app = setup_app_paths(temp.path());
        write_file(
            &core_defs(&app, "defs.xml"),
            r#"<Defs>
                <ThingDef>
                    <defName>Gun_Revolver</defName><label>revolver</label>
                    <category>Item</category><marketValue>150</marketValue>
                    <techLevel>Industrial</techLevel>
                    <flags><li>Weapon</li></flags>
                </ThingDef>
                <TerrainDef>
                    <defName>WoodFloor</defName><label>wood floor</label>
                    <designationCategory>Floors</designationCategory><buildable>true</buildable>
                </TerrainDef>
                <PawnKindDef>
                    <defName>Muffalo</defName><label>muffalo</label>
                    <race><intelligence>Animal</intelligence></race>
                </PawnKindDef>
            </Defs>"#,
        );

        let db = load_def_database(&app, &ContentLoadRequest::default()).expect("load");
        assert_eq!(db.len(), 3);

        let gun = db.get("Gun_Revolver").expect("gun");
        let thing = gun.as_thing().expect("thing");
        assert_eq!(thing.category, ThingCategory::Item);
        assert!(thing.flags.contains(ThingFlags::WEAPON));
        assert!((thing.market_value - 150.0).abs() < f32::EPSILON);
        assert_eq!(gun.pack_key(), CORE_PACK_NAME);

        let floor = db.get("WoodFloor").expect("floor");
        assert!(floor.as_terrain().expect("terrain").buildable);

        let muffalo = db.get("Muffalo").expect("muffalo");
        assert!(muffalo.as_pawn_kind().expect("kind").race.is_some());
    }

    #[test]
    fn files_load_in_relative_path_order() {
        let temp = TempDir::new().expect("temp");
        let app = setup_app_paths(temp.path());
        write_file(
            &core_defs(&app, "b/later.xml"),
            r#"<Defs><TerrainDef><defName>Later</defName><buildable>true</buildable></TerrainDef></Defs>"#,
        );
        write_file(
            &core_defs(&app, "a.xml"),
            r#"<Defs><TerrainDef><defName>Earlier</defName><buildable>true</buildable></TerrainDef></Defs>"#,
        );

        let db = load_def_database(&app, &ContentLoadRequest::default()).expect("load");
        let names = db
            .definitions()
            .iter()
            .map(|def| def.def_name.as_str())
            .collect::<Vec<_>>();
        assert_eq!(names, vec!["Earlier", "Later"]);
    }

    #[test]
    fn later_pack_overrides_and_owns_definition() {
        let temp = TempDir::new().expect("temp");
        let app = setup_app_paths(temp.path());
        write_file(
            &core_defs(&app, "defs.xml"),
            r#"<Defs><ThingDef><defName>Beer</defName><label>beer</label><category>Item</category><marketValue>5</marketValue></ThingDef></Defs>"#,
        );
        write_file(
            &app.packs_dir.join("brewery").join("About.xml"),
            "<ModMetaData><name>Brewery</name><packageId>author.brewery</packageId></ModMetaData>",
        );
        write_file(
            &app.packs_dir.join("brewery").join(DEFS_DIR_NAME).join("beer.xml"),
            r#"<Defs><ThingDef><defName>Beer</defName><label>craft beer</label><category>Item</category><marketValue>9</marketValue></ThingDef></Defs>"#,
        );

        let db = load_def_database(&app, &request(&["brewery"])).expect("load");
        let beer = db.get("Beer").expect("beer");
        assert_eq!(beer.label, "craft beer");
        assert_eq!(beer.pack_key(), "Brewery");
    }

    #[test]
    fn missing_def_name_reports_pack_file_and_location() {
        let temp = TempDir::new().expect("temp");
        let app = setup_app_paths(temp.path());
        write_file(
            &core_defs(&app, "defs.xml"),
            r#"<Defs><ThingDef><label>X</label></ThingDef></Defs>"#,
        );
        let err = load_def_database(&app, &ContentLoadRequest::default()).expect_err("err");
        assert_eq!(err.code, ContentErrorCode::MissingField);
        assert_eq!(err.pack_id, "core");
        assert!(err.file_path.ends_with(Path::new("Defs").join("defs.xml")));
        assert!(err.location.is_some());
    }

    #[test]
    fn unknown_field_and_def_type_error() {
        let temp = TempDir::new().expect("temp");
        let app = setup_app_paths(temp.path());
        write_file(
            &core_defs(&app, "defs.xml"),
            r#"<Defs><ThingDef><defName>a</defName><mood>Happy</mood></ThingDef></Defs>"#,
        );
        let err = load_def_database(&app, &ContentLoadRequest::default()).expect_err("err");
        assert_eq!(err.code, ContentErrorCode::UnknownField);

        write_file(
            &core_defs(&app, "defs.xml"),
            r#"<Defs><RecipeDef><defName>a</defName></RecipeDef></Defs>"#,
        );
        let err = load_def_database(&app, &ContentLoadRequest::default()).expect_err("err");
        assert_eq!(err.code, ContentErrorCode::UnknownDefType);
    }

    #[test]
    fn invalid_values_error() {
        let temp = TempDir::new().expect("temp");
        let app = setup_app_paths(temp.path());
        for body in [
            "<ThingDef><defName>a</defName><category>Vehicle</category></ThingDef>",
            "<ThingDef><defName>a</defName><marketValue>-1</marketValue></ThingDef>",
            "<ThingDef><defName>a</defName><flags><li>Shiny</li></flags></ThingDef>",
            "<TerrainDef><defName>a</defName><water>maybe</water></TerrainDef>",
            "<PawnKindDef><defName>a</defName><race><intelligence>Genius</intelligence></race></PawnKindDef>",
        ] {
            write_file(&core_defs(&app, "defs.xml"), &format!("<Defs>{body}</Defs>"));
            let err = load_def_database(&app, &ContentLoadRequest::default()).expect_err("err");
            assert_eq!(err.code, ContentErrorCode::InvalidValue, "body {body}");
        }
    }

    #[test]
    fn malformed_xml_reports_location() {
        let temp = TempDir::new().expect("temp");
        let app = setup_app_paths(temp.path());
        write_file(
            &core_defs(&app, "defs.xml"),
            r#"<Defs><ThingDef><defName>a</defName></Defs>"#,
        );
        let err = load_def_database(&app, &ContentLoadRequest::default()).expect_err("err");
        assert_eq!(err.code, ContentErrorCode::XmlMalformed);
        assert!(err.location.is_some());
    }

    #[test]
    fn same_pack_duplicate_def_errors() {
        let temp = TempDir::new().expect("temp");
        let app = setup_app_paths(temp.path());
        write_file(
            &core_defs(&app, "defs.xml"),
            r#"<Defs>
                <TerrainDef><defName>a</defName></TerrainDef>
                <TerrainDef><defName>a</defName></TerrainDef>
            </Defs>"#,
        );
        let err = load_def_database(&app, &ContentLoadRequest::default()).expect_err("err");
        assert_eq!(err.code, ContentErrorCode::DuplicateDefInPack);
    }

    #[test]
    fn missing_pack_maps_to_discovery_error() {
        let temp = TempDir::new().expect("temp");
        let app = setup_app_paths(temp.path());
        let err = load_def_database(&app, &request(&["ghost"])).expect_err("err");
        assert_eq!(err.code, ContentErrorCode::Discovery);
        assert_eq!(err.pack_id, "ghost");
    }

    #[test]
    fn shipped_content_loads_with_every_pack() {
        let root = Path::new(env!("CARGO_MANIFEST_DIR")).join("..").join("..");
        let app = AppPaths::from_root(root);
        let db = load_def_database(&app, &request(&["brewery", "glitter_tech"])).expect("load");
        assert_eq!(db.len(), 32);

        let meal = db.get("MealSimple").expect("meal");
        assert_eq!(meal.label, "simple meal with beer");
        assert_eq!(meal.pack_key(), "Brewery");
        assert_eq!(db.get("Soil").expect("soil").pack_key(), CORE_PACK_NAME);
    }
}
