//! # CLI Command Implementations
//!
//! This module contains the actual implementations of CLI commands.

use crate::api;
use crate::config::AppConfig;
use kindred_core::{
    Dataset, FamilyView, KindredError, PersonId, Session, SnapshotJson, ViewMode,
    dataset_from_bytes, dataset_to_bytes, parse_date,
};
use std::path::{Path, PathBuf};

// =============================================================================
// FILE SIZE LIMITS
// =============================================================================

/// Maximum size of a JSON dataset accepted by `import` (200 MB).
const MAX_IMPORT_FILE_SIZE: u64 = 200 * 1024 * 1024;

/// Validate file size before reading.
fn validate_file_size(path: &Path, max_size: u64) -> Result<(), KindredError> {
    let metadata = std::fs::metadata(path)
        .map_err(|e| KindredError::IoError(format!("Cannot read file metadata: {}", e)))?;

    if metadata.len() > max_size {
        return Err(KindredError::IoError(format!(
            "File size {} bytes exceeds maximum allowed {} bytes",
            metadata.len(),
            max_size
        )));
    }
    Ok(())
}

/// Resolve an input path and ensure it names a regular file.
fn validate_file_path(path: &Path) -> Result<PathBuf, KindredError> {
    let canonical = path.canonicalize().map_err(|e| {
        KindredError::IoError(format!("Invalid file path '{}': {}", path.display(), e))
    })?;

    if !canonical.is_file() {
        return Err(KindredError::IoError(format!(
            "Path '{}' is not a regular file",
            path.display()
        )));
    }

    Ok(canonical)
}

// =============================================================================
// COMMAND CONTEXT
// =============================================================================

/// Global options shared by every command.
#[derive(Debug, Clone)]
pub struct CommandContext {
    pub db_path: PathBuf,
    /// "file" or "redb".
    pub backend: String,
    pub json_mode: bool,
    pub config: AppConfig,
}

impl CommandContext {
    fn open_session(&self) -> Result<Session, KindredError> {
        Ok(load_or_create_session(&self.db_path, &self.backend)?
            .with_config(self.config.view.clone()))
    }

    fn name_of(&self, session: &Session, id: PersonId) -> String {
        session
            .person(id)
            .map(|person| person.full_name(self.config.view.language.as_deref()))
            .unwrap_or_else(|_| "?".to_string())
    }
}

fn print_json(value: &serde_json::Value) {
    println!("{}", serde_json::to_string_pretty(value).unwrap_or_default());
}

// =============================================================================
// SERVER COMMAND
// =============================================================================

/// Start the HTTP server.
pub async fn cmd_server(ctx: &CommandContext, host: &str, port: u16) -> Result<(), KindredError> {
    let session = ctx.open_session()?;
    let metrics = session.metrics()?;

    println!("Kindred Server Starting...");
    println!();
    println!("Configuration:");
    println!("  Host:     {}", host);
    println!("  Port:     {}", port);
    println!("  Backend:  {}", ctx.backend);
    println!("  Database: {:?}", ctx.db_path);
    println!("  Persons:  {}", metrics.person_count);
    println!();
    println!("Endpoints:");
    println!("  GET  /health                - Health check");
    println!("  GET  /status                - Dataset and view status");
    println!("  GET  /persons/{{id}}/families - Families around a person");
    println!("  POST /view                  - Build a view graph");
    println!("  GET  /view                  - Current view snapshot");
    println!("  POST /view/show             - Show a family");
    println!("  POST /view/hide             - Hide a family");
    println!();
    println!("Press Ctrl+C to stop");
    println!();

    let addr = format!("{}:{}", host, port);
    let cors_origins = ctx.config.server.effective_cors_origins();
    api::run_server(&addr, session, cors_origins).await
}

// =============================================================================
// STATUS COMMAND
// =============================================================================

/// Show dataset metrics.
pub fn cmd_status(ctx: &CommandContext) -> Result<(), KindredError> {
    let session = ctx.open_session()?;
    let metrics = session.metrics()?;

    if ctx.json_mode {
        print_json(&serde_json::json!({
            "database": ctx.db_path.to_string_lossy(),
            "backend": ctx.backend,
            "metrics": metrics,
        }));
        return Ok(());
    }

    println!("Kindred Dataset Status");
    println!("======================");
    println!("Database: {:?}", ctx.db_path);
    println!("Backend:  {}", ctx.backend);
    println!();
    println!("Persons:            {}", metrics.person_count);
    println!("Living:             {}", metrics.living_count);
    println!("Relationships:      {}", metrics.relationship_count);
    println!("  Couple:           {}", metrics.couple_count);
    println!("  Parent-child:     {}", metrics.parent_child_count);
    println!("Dangling refs:      {}", metrics.dangling_references);
    println!(
        "Parent links/person: {} millionths",
        metrics.parent_links_per_person_millionths
    );

    Ok(())
}

// =============================================================================
// IMPORT COMMAND
// =============================================================================

/// Load a JSON dataset, replacing the stored one.
pub fn cmd_import(ctx: &CommandContext, input: &Path) -> Result<(), KindredError> {
    let validated_path = validate_file_path(input)?;
    validate_file_size(&validated_path, MAX_IMPORT_FILE_SIZE)?;

    let data = std::fs::read(&validated_path)
        .map_err(|e| KindredError::IoError(format!("Read file: {}", e)))?;
    let dataset: Dataset = serde_json::from_slice(&data)
        .map_err(|e| KindredError::DeserializationError(format!("Dataset JSON: {}", e)))?;

    let mut session = ctx.open_session()?;
    let metrics = session.load_dataset(&dataset)?;
    save_session(&session, &ctx.db_path)?;

    if ctx.json_mode {
        print_json(&serde_json::json!({ "imported": true, "metrics": metrics }));
    } else {
        println!(
            "Imported dataset: {} persons, {} relationships",
            metrics.person_count, metrics.relationship_count
        );
        if metrics.dangling_references > 0 {
            println!(
                "Warning: {} relationship endpoints reference missing persons",
                metrics.dangling_references
            );
        }
    }

    Ok(())
}

// =============================================================================
// INIT COMMAND
// =============================================================================

/// Initialize new database.
pub fn cmd_init(ctx: &CommandContext, force: bool) -> Result<(), KindredError> {
    let db_path = &ctx.db_path;
    if db_path.exists() && !force {
        return Err(KindredError::IoError(
            "Database already exists. Use --force to overwrite.".to_string(),
        ));
    }

    match ctx.backend.as_str() {
        "redb" => {
            let mut session = Session::with_redb(db_path)?;
            session.load_dataset(&Dataset::default())?;
            println!("Initialized new redb database at {:?}", db_path);
        }
        _ => {
            save_session(&Session::new(), db_path)?;
            println!("Initialized new file database at {:?}", db_path);
        }
    }

    Ok(())
}

// =============================================================================
// FAMILIES COMMAND
// =============================================================================

/// Show the families in which a person is a parent and a child.
pub fn cmd_families(ctx: &CommandContext, person: u64) -> Result<(), KindredError> {
    let person = PersonId(person);
    let mut session = ctx.open_session()?;
    session.person(person)?;
    let as_parent = session.families_as_parent(person)?;
    let as_child = session.families_as_child(person)?;

    if ctx.json_mode {
        print_json(&serde_json::json!({
            "person": person,
            "as_parent": as_parent,
            "as_child": as_child,
        }));
        return Ok(());
    }

    println!("Families of {} ({})", ctx.name_of(&session, person), person);
    println!();
    println!("As parent: {}", as_parent.len());
    for family in &as_parent {
        print_family(ctx, &session, family);
    }
    println!("As child:  {}", as_child.len());
    for family in &as_child {
        print_family(ctx, &session, family);
    }

    Ok(())
}

fn print_family(ctx: &CommandContext, session: &Session, family: &FamilyView) {
    let parents: Vec<String> = family
        .parents()
        .map(|id| format!("{} ({})", ctx.name_of(session, id), id))
        .collect();
    println!("  {}", parents.join(" + "));
    if let Some(date) = &family.marriage_date {
        println!("    married {}", date);
    }
    for child in &family.children {
        println!("    - {} ({})", ctx.name_of(session, *child), child);
    }
}

// =============================================================================
// CLOSURE COMMANDS
// =============================================================================

/// List a person and every ancestor.
pub fn cmd_ancestors(ctx: &CommandContext, person: u64) -> Result<(), KindredError> {
    let session = ctx.open_session()?;
    let person = PersonId(person);
    session.person(person)?;
    let ancestors = session.ancestors(person)?;
    print_closure(ctx, &session, "Ancestors", &ancestors);
    Ok(())
}

/// List a person and every descendant.
pub fn cmd_descendants(ctx: &CommandContext, person: u64) -> Result<(), KindredError> {
    let session = ctx.open_session()?;
    let person = PersonId(person);
    session.person(person)?;
    let descendants = session.descendants(person)?;
    print_closure(ctx, &session, "Descendants", &descendants);
    Ok(())
}

fn print_closure(ctx: &CommandContext, session: &Session, title: &str, ids: &[PersonId]) {
    if ctx.json_mode {
        print_json(&serde_json::json!({ "persons": ids }));
        return;
    }

    println!("{} ({} including start)", title, ids.len());
    for id in ids {
        println!("  {:>6}  {}", id.0, ctx.name_of(session, *id));
    }
}

// =============================================================================
// AGE COMMAND
// =============================================================================

/// Estimate the age of `person` in the family of `start`.
pub fn cmd_age(
    ctx: &CommandContext,
    start: u64,
    person: u64,
    as_of: Option<&str>,
) -> Result<(), KindredError> {
    let mut session = ctx.open_session()?;
    if let Some(raw) = as_of {
        let date = parse_date(raw)
            .and_then(|date| date.to_naive())
            .ok_or_else(|| KindredError::InvalidDataset(format!("Invalid date: {}", raw)))?;
        session = session.with_as_of(date);
    }

    let (start, person) = (PersonId(start), PersonId(person));
    let age = session.estimate_age(start, person)?;
    let generation = session.context().and_then(|context| context.generation(person));

    if ctx.json_mode {
        print_json(&serde_json::json!({
            "start": start,
            "person": person,
            "generation": generation,
            "age": age,
        }));
        return Ok(());
    }

    let name = ctx.name_of(&session, person);
    match generation {
        Some(generation) => println!("{} ({}): generation {}", name, person, generation),
        None => println!("{} ({}): not connected to {}", name, person, start),
    }
    match age {
        Some(age) => println!("Age: {}", age),
        None => println!("Age: unknown"),
    }

    Ok(())
}

// =============================================================================
// VIEW COMMAND
// =============================================================================

/// Build a view graph and print or save its snapshot.
pub fn cmd_view(
    ctx: &CommandContext,
    start: u64,
    mode: ViewMode,
    output: Option<&Path>,
) -> Result<(), KindredError> {
    let mut session = ctx.open_session()?;
    let (graph, report) =
        session.build_view_graph(PersonId(start), mode, |done, total| {
            tracing::debug!(done, total, "populating view");
        })?;
    let snapshot = SnapshotJson::from(&graph);

    if let Some(path) = output {
        let data = serde_json::to_vec_pretty(&snapshot)
            .map_err(|e| KindredError::SerializationError(e.to_string()))?;
        std::fs::write(path, data)
            .map_err(|e| KindredError::IoError(format!("Write snapshot: {}", e)))?;
        tracing::info!(path = %path.display(), "snapshot written");
    } else if ctx.json_mode {
        print_json(&serde_json::json!({ "report": report, "snapshot": snapshot }));
        return Ok(());
    }

    if ctx.json_mode {
        print_json(&serde_json::json!({ "report": report }));
        return Ok(());
    }

    println!("View of {} ({} mode)", ctx.name_of(&session, graph.start()), mode);
    println!("=======================");
    println!("Person nodes: {}", graph.person_count());
    println!("Family nodes: {}", graph.family_count());
    println!("Etc nodes:    {}", graph.etc_count());
    println!("Links:        {}", graph.link_count());
    println!(
        "Families:     {} of {} shown{}",
        report.families_shown,
        report.families_requested,
        if report.truncated {
            " (truncated by max_person_nodes)"
        } else {
            ""
        }
    );
    if let Some(path) = output {
        println!("Snapshot:     {:?}", path);
    }

    Ok(())
}

// =============================================================================
// HELPER FUNCTIONS
// =============================================================================

/// Load or create a session from a database path with specified backend.
pub fn load_or_create_session(db_path: &Path, backend: &str) -> Result<Session, KindredError> {
    match backend {
        "redb" => Session::with_redb(db_path),
        "file" => {
            if db_path.exists() {
                let data = std::fs::read(db_path)
                    .map_err(|e| KindredError::IoError(format!("Read db: {}", e)))?;
                let dataset = dataset_from_bytes(&data)?;
                let mut session = Session::new();
                if !dataset.is_empty() {
                    session.load_dataset(&dataset)?;
                }
                Ok(session)
            } else {
                Ok(Session::new())
            }
        }
        other => Err(KindredError::InvalidDataset(format!(
            "Unknown backend '{}': expected 'file' or 'redb'",
            other
        ))),
    }
}

/// Save a session to a database path.
pub fn save_session(session: &Session, db_path: &Path) -> Result<(), KindredError> {
    if session.is_persistent() {
        // Redb commits on every write
        return Ok(());
    }
    let data = dataset_to_bytes(&session.dataset()?)?;
    std::fs::write(db_path, &data).map_err(|e| KindredError::IoError(format!("Write db: {}", e)))
}
