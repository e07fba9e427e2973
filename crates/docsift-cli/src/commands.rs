// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Command implementations.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use docsift_codec::{chunk_text, decode, encode, normalize_text, sanitize_identifier};
use docsift_core::error::{DocsiftError, Result};
use docsift_core::traits::{DatasetSink, TextChunkSink};
use docsift_core::{DocumentKind, PipelineConfig, RegionClass};
use docsift_document::{
    ArtifactLayout, CancelToken, CommandLayoutModel, CommandTableExtractor, DocumentContext,
    DocumentProcessor, LayoutModel, ModelPool, TesseractRecognizer, TextRecognizer, export_csv,
    load_data_file,
};
use docsift_store::SqliteStore;
use serde_json::json;
use tracing::{info, warn};

use crate::{Cli, Commands, ProcessArgs};

pub async fn run(cli: Cli) -> Result<()> {
    let mut config = match &cli.config {
        Some(path) => PipelineConfig::load(path)?,
        None => PipelineConfig::default(),
    };
    if let Some(root) = cli.artifact_root {
        config.artifact_root = root;
    }

    match cli.command {
        Commands::Process(args) => {
            apply_overrides(&mut config, &args);
            config.validate()?;
            process(&config, args).await
        }
        Commands::Decode { input } => {
            let dataset = decode(&std::fs::read_to_string(&input)?)?;
            println!("{}", serde_json::to_string_pretty(&dataset)?);
            Ok(())
        }
        Commands::Sanitize { raw } => {
            println!("{}", sanitize_identifier(&raw));
            Ok(())
        }
        Commands::Normalize { input } => {
            println!("{}", normalize_text(&std::fs::read_to_string(&input)?));
            Ok(())
        }
        Commands::Clean => {
            ArtifactLayout::new(&config.artifact_root).clear()?;
            info!(root = %config.artifact_root.display(), "artifacts cleared");
            Ok(())
        }
        Commands::ImportData { input } => {
            let loaded = load_data_file(&input)?;
            println!("{}", loaded.name);
            println!("{}", encode(&loaded.dataset));
            Ok(())
        }
        Commands::ExportCsv { input, name } => {
            let layout = ArtifactLayout::new(&config.artifact_root);
            let path = export_table(&layout, &input, &name)?;
            println!("{}", path.display());
            Ok(())
        }
        Commands::PersistTable { input, name, db } => {
            let store = SqliteStore::open(&db)?;
            persist_table(&store, &input, &name)
        }
        Commands::PersistText { input, name, db } => {
            let store = SqliteStore::open(&db)?;
            let chunks = persist_text(&store, &input, name.as_deref(), config.text_chunk_chars)?;
            println!("{chunks}");
            Ok(())
        }
    }
}

/// Command-line values win over the config file.
fn apply_overrides(config: &mut PipelineConfig, args: &ProcessArgs) {
    if let Some(conf) = args.conf {
        config.confidence_threshold = conf;
    }
    if let Some(iou) = args.iou {
        config.iou_threshold = iou;
    }
    if let Some(dpi) = args.dpi {
        config.raster_dpi = dpi;
    }
    if let Some(workers) = args.workers {
        config.detection_workers = workers;
    }
    config.extraction.implicit_rows |= args.implicit_rows;
    config.extraction.implicit_columns |= args.implicit_columns;
    config.extraction.borderless_tables |= args.borderless;
}

/// Clear the artifact tree and store the upload in the uploads directory,
/// keeping its file name. The upload is checked and read first, so a
/// rejected input clears nothing and an input inside the tree survives.
fn store_upload(layout: &ArtifactLayout, input: &Path) -> Result<PathBuf> {
    let file_name = input.file_name().ok_or_else(|| {
        DocsiftError::UnreadableInput(format!("{} is not a file", input.display()))
    })?;
    if DocumentKind::from_path(input).is_none() {
        let extension = input.extension().and_then(|e| e.to_str()).unwrap_or("no extension");
        return Err(DocsiftError::UnsupportedDocument(extension.to_string()));
    }
    if !input.is_file() {
        return Err(DocsiftError::UnreadableInput(format!(
            "{} does not exist",
            input.display()
        )));
    }
    let bytes = std::fs::read(input)?;
    layout.clear()?;
    let target = layout.uploads_dir().join(file_name);
    std::fs::write(&target, bytes)?;
    Ok(target)
}

#[cfg(feature = "ocr")]
fn builtin_recognizer(args: &ProcessArgs) -> Result<Option<Box<dyn TextRecognizer>>> {
    match &args.ocr_models {
        Some(dir) => Ok(Some(Box::new(docsift_document::OcrEngine::from_model_dir(dir)?))),
        None => Ok(None),
    }
}

#[cfg(not(feature = "ocr"))]
fn builtin_recognizer(_args: &ProcessArgs) -> Result<Option<Box<dyn TextRecognizer>>> {
    Ok(None)
}

fn recognizer(args: &ProcessArgs) -> Result<Option<Box<dyn TextRecognizer>>> {
    if let Some(engine) = builtin_recognizer(args)? {
        return Ok(Some(engine));
    }
    if args.ocr {
        return Ok(Some(Box::new(TesseractRecognizer::new(args.lang.clone()))));
    }
    Ok(None)
}

async fn process(config: &PipelineConfig, args: ProcessArgs) -> Result<()> {
    let layout = ArtifactLayout::new(&config.artifact_root);
    let upload = store_upload(&layout, &args.input)?;

    let program = args.model_command.clone();
    let model_args = args.model_args.clone();
    let mut pool = ModelPool::initialize(config.detection_workers, |_| {
        let model = CommandLayoutModel::new(program.clone()).with_args(model_args.clone());
        Ok(Box::new(model) as Box<dyn LayoutModel>)
    })?;
    if let Some(secs) = args.timeout_secs {
        pool = pool.with_timeout(Duration::from_secs(secs));
    }
    let pool = Arc::new(pool);

    let cancel = CancelToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupted; finishing pages already in progress");
            on_interrupt.cancel();
        }
    });

    let processor = DocumentProcessor::new(Arc::clone(&pool), config);
    let outcome = processor.process_file(&upload, &cancel).await;
    pool.release()?;
    let result = outcome?;
    for failure in &result.failures {
        warn!(page = failure.page, reason = %failure.reason, "page failed");
    }

    let mut context = DocumentContext::new(&upload, layout, result)?;

    if let Some(program) = &args.table_extractor {
        let extractor = CommandTableExtractor::new(program);
        for (crop, reason) in context.extract_tables(&extractor, &config.extraction) {
            warn!(crop = %crop.display(), %reason, "table extraction failed");
        }
    }

    attach_figure_files(&mut context, &args.figure_data);

    if let Some(recognizer) = recognizer(&args)? {
        context.recognize_text(recognizer.as_ref())?;
    }

    let exported = if args.export_csv {
        export_named(&context)?
    } else {
        Vec::new()
    };

    if let Some(db) = &args.db {
        let store = SqliteStore::open(db)?;
        persist_context(&context, &store, config.text_chunk_chars)?;
    }

    let report = json!({
        "document_id": context.id(),
        "fingerprint": context.fingerprint(),
        "result": context.result(),
        "tables": context.entries(RegionClass::Table),
        "figures": context.entries(RegionClass::Figure),
        "text": context.text(),
        "exported": exported,
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

/// Attach data files to figures in detection order. A file that cannot be
/// attached is reported and leaves its figure untouched.
fn attach_figure_files(context: &mut DocumentContext, files: &[PathBuf]) {
    let figures = context.entries(RegionClass::Figure).len();
    if files.len() > figures {
        warn!(files = files.len(), figures, "more data files than figures; extras ignored");
    }
    for (index, path) in files.iter().take(figures).enumerate() {
        match context.attach_figure_file(index, path) {
            Ok(entry) => info!(index, name = %entry.name, "figure data attached"),
            Err(err) => {
                warn!(index, path = %path.display(), error = %err, "figure data not attached");
            }
        }
    }
}

/// Export every named table and figure that holds data.
fn export_named(context: &DocumentContext) -> Result<Vec<PathBuf>> {
    let mut written = Vec::new();
    for class in [RegionClass::Table, RegionClass::Figure] {
        for (index, entry) in context.entries(class).iter().enumerate() {
            if entry.name.is_empty() {
                continue;
            }
            if let Some(path) = context.export_csv(class, index)? {
                written.push(path);
            }
        }
    }
    Ok(written)
}

fn export_table(layout: &ArtifactLayout, input: &Path, raw_name: &str) -> Result<PathBuf> {
    let name = sanitize_identifier(raw_name);
    if name.is_empty() {
        return Err(DocsiftError::Config(format!(
            "{raw_name:?} does not yield a usable table name"
        )));
    }
    let dataset = decode(&std::fs::read_to_string(input)?)?;
    export_csv(&layout.data_dir(), &name, &dataset)
}

/// Persist every named table and the text. Unnamed tables are skipped.
fn persist_context<S>(context: &DocumentContext, store: &S, chunk_chars: usize) -> Result<()>
where
    S: DatasetSink + TextChunkSink,
{
    for (index, entry) in context.entries(RegionClass::Table).iter().enumerate() {
        if entry.name.is_empty() {
            continue;
        }
        context.persist(RegionClass::Table, index, store)?;
    }
    let chunks = context.persist_text(store, chunk_chars)?;
    info!(chunks, "text persisted");
    Ok(())
}

fn persist_table(sink: &dyn DatasetSink, input: &Path, raw_name: &str) -> Result<()> {
    let name = sanitize_identifier(raw_name);
    if name.is_empty() {
        return Err(DocsiftError::Config(format!(
            "{raw_name:?} does not yield a usable table name"
        )));
    }
    let dataset = decode(&std::fs::read_to_string(input)?)?;
    sink.persist_dataset(&name, &dataset)?;
    info!(%name, rows = dataset.row_count(), "table persisted");
    Ok(())
}

fn persist_text(
    sink: &dyn TextChunkSink,
    input: &Path,
    name: Option<&str>,
    chunk_chars: usize,
) -> Result<usize> {
    let text = std::fs::read_to_string(input)?;
    let chunks = chunk_text(&text, chunk_chars);
    if chunks.is_empty() {
        return Ok(0);
    }
    let name = match name {
        Some(name) => name.to_string(),
        None => input
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default(),
    };
    sink.persist_text_chunks(&name, &chunks)?;
    Ok(chunks.len())
}
