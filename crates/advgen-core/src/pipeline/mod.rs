//! Pipeline - drives extraction, grounding, perturbation and encoding over a
//! grid of observability levels and attack rates.

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::{json, Value};

use crate::config::GeneratorConfig;
use crate::corpus::{self, pddl, CorpusFormat, Workspace};
use crate::error::{ItemFailure, PipelineError, Result, Step};
use crate::events::EventEmitter;
use crate::grounding::{normalize_instances, Grounder};
use crate::perturb::perturb;
use crate::rng::{derive_seed, SplitMix64};
use crate::vocab::Vocabulary;

/// Observability level whose observation files expose the full action
/// surface. Vocabularies are built from this level only.
pub const FULL_OBSERVABILITY_LEVEL: u8 = 100;

/// Encoded record for one processed item.
#[derive(Debug, Clone, Serialize)]
pub struct ItemRecord {
    pub init_state: Vec<u32>,
    pub obs: Vec<u32>,
    pub real_goal: Vec<u32>,
    pub mask: Vec<u8>,
    pub goals: Vec<Vec<u32>>,
}

/// Successful outcome of one item, with the counts the histogram needs.
#[derive(Debug)]
pub struct ItemOutcome {
    pub record: ItemRecord,
    pub substitutions: usize,
    pub observations: usize,
}

/// Shared read-only inputs for processing one domain.
pub struct DomainContext<'a> {
    pub format: CorpusFormat,
    pub grounder: &'a dyn Grounder,
    pub actions: &'a Vocabulary,
    pub goals: &'a Vocabulary,
    pub seed: u64,
}

type StepResult<T> = std::result::Result<T, (Step, PipelineError)>;

/// Run one item through every pipeline step.
///
/// `scratch` must be exclusive to this item for the duration of the call.
async fn process_item(
    archive: &Path,
    scratch: &Path,
    ctx: &DomainContext<'_>,
    rate_percent: f64,
    rng: &mut SplitMix64,
) -> StepResult<ItemOutcome> {
    let workspace = Workspace::extract(archive, scratch).map_err(|e| (Step::Extract, e))?;

    let observations =
        corpus::read_observations(workspace.root()).map_err(|e| (Step::Observations, e))?;
    let hypotheses = corpus::read_hypotheses(workspace.root(), ctx.format)
        .map_err(|e| (Step::Hypotheses, e))?;
    let real_goal =
        corpus::read_real_goal(workspace.root(), ctx.format).map_err(|e| (Step::RealGoal, e))?;

    let template = corpus::read_template(workspace.root()).map_err(|e| (Step::InitState, e))?;
    let init_state = pddl::parse_init_section(&template);

    let goal_line =
        corpus::read_real_goal_line(workspace.root()).map_err(|e| (Step::Grounding, e))?;
    let problem = pddl::write_problem(workspace.root(), &template, &goal_line)
        .map_err(|e| (Step::Grounding, e))?;
    let instances = ctx
        .grounder
        .ground(&workspace.domain_file(), &problem)
        .await
        .map_err(|e| (Step::Grounding, e))?;
    let pool = normalize_instances(&instances);

    let perturbation =
        perturb(&observations, rate_percent, &pool, rng).map_err(|e| (Step::Perturbation, e))?;

    let obs = ctx
        .actions
        .encode_observations(&perturbation.observations)
        .map_err(|e| (Step::Encoding, e))?;

    let record = ItemRecord {
        init_state: ctx.goals.encode_goal(&init_state),
        obs,
        real_goal: ctx.goals.encode_goal(&real_goal),
        mask: perturbation.mask,
        goals: hypotheses.iter().map(|g| ctx.goals.encode_goal(g)).collect(),
    };

    Ok(ItemOutcome {
        record,
        substitutions: perturbation.substitutions,
        observations: observations.len(),
    })
}

/// Outcome of one grid cell.
#[derive(Debug, Default)]
pub struct CellReport {
    /// Every successfully processed item, exactly once.
    pub records: BTreeMap<String, ItemRecord>,
    /// Substitution count -> number of items with exactly that count.
    pub histogram: BTreeMap<usize, usize>,
    pub total_substitutions: usize,
    pub total_observations: usize,
    /// Items that failed, with the step that failed them.
    pub failures: Vec<ItemFailure>,
}

impl CellReport {
    /// Substitutions over observation positions, successful items only.
    pub fn actual_attack_percent(&self) -> f64 {
        if self.total_observations == 0 {
            0.0
        } else {
            self.total_substitutions as f64 / self.total_observations as f64 * 100.0
        }
    }

    /// Histogram document written next to the record map: buckets keyed by
    /// stringified substitution count, scalars as sibling keys.
    pub fn analysis_json(&self) -> Value {
        let mut doc = serde_json::Map::new();
        for (substitutions, count) in &self.histogram {
            doc.insert(substitutions.to_string(), json!(count));
        }
        doc.insert("actual_atk_perc".to_string(), json!(self.actual_attack_percent()));
        if !self.failures.is_empty() {
            doc.insert("errors".to_string(), json!(self.failures.len()));
        }
        Value::Object(doc)
    }
}

fn list_archives(plans_dir: &Path) -> Result<Vec<PathBuf>> {
    let mut archives: Vec<PathBuf> = std::fs::read_dir(plans_dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.file_name()
                .and_then(|n| n.to_str())
                .map(|n| n.ends_with(".zip") || n.ends_with(".tar.bz2"))
                .unwrap_or(false)
        })
        .collect();
    // Sorted item order keeps run output (and RNG consumption) deterministic.
    archives.sort();
    Ok(archives)
}

fn item_name(archive: &Path) -> String {
    archive
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| archive.display().to_string())
}

/// Process every archive in `plans_dir` at one attack rate.
///
/// Each item gets an exclusive scratch directory under `scratch_root` and an
/// RNG derived from `(seed, cell, item index)`. A failing step aborts only
/// its item: the failure is recorded, optionally snapshotted into
/// `failures_dir`, and the cell carries on.
pub async fn process_cell(
    ctx: &DomainContext<'_>,
    plans_dir: &Path,
    scratch_root: &Path,
    level: u8,
    rate: u8,
    events: Option<&EventEmitter>,
    failures_dir: Option<&Path>,
) -> Result<CellReport> {
    let archives = list_archives(plans_dir)?;
    tracing::info!(
        plans = %plans_dir.display(),
        items = archives.len(),
        level,
        rate,
        "Processing grid cell"
    );

    let cell_stream = ((level as u64) << 8) | rate as u64;
    let mut report = CellReport::default();

    for (index, archive) in archives.iter().enumerate() {
        let item = item_name(archive);
        let scratch = scratch_root.join(format!("item-{index}"));
        let mut rng = SplitMix64::new(derive_seed(ctx.seed, cell_stream, index as u64));

        match process_item(archive, &scratch, ctx, rate as f64, &mut rng).await {
            Ok(outcome) => {
                *report.histogram.entry(outcome.substitutions).or_insert(0) += 1;
                report.total_substitutions += outcome.substitutions;
                report.total_observations += outcome.observations;
                report.records.insert(item, outcome.record);
            }
            Err((step, error)) => {
                tracing::warn!(item = %item, step = %step, error = %error, "Item failed; continuing");
                if let Some(events) = events {
                    let _ = events.emit_failure(&item, step.name(), &error.to_string());
                }
                if let Some(failures_dir) = failures_dir {
                    if scratch.exists() {
                        let _ = Workspace::open(&scratch).snapshot_to(&failures_dir.join(&item));
                    }
                }
                report.failures.push(ItemFailure {
                    item,
                    step,
                    source: error,
                });
            }
        }

        let _ = std::fs::remove_dir_all(&scratch);
    }

    Ok(report)
}

/// Per-domain run totals.
#[derive(Debug, Default, Serialize)]
pub struct DomainSummary {
    pub domain: String,
    pub cells: usize,
    pub items_ok: usize,
    pub items_failed: usize,
}

/// Process a full domain: every configured observability level crossed with
/// every attack rate. The vocabulary pair must already exist; a load failure
/// is fatal for the whole domain.
pub async fn run_domain(
    config: &GeneratorConfig,
    grounder: &dyn Grounder,
    domain: &str,
) -> Result<DomainSummary> {
    let actions = Vocabulary::load(&config.action_vocab_path(domain))?;
    let goals = Vocabulary::load(&config.goal_vocab_path(domain))?;
    tracing::info!(
        domain,
        actions = actions.len(),
        goal_predicates = goals.len(),
        "Loaded vocabularies"
    );

    let ctx = DomainContext {
        format: config.format,
        grounder,
        actions: &actions,
        goals: &goals,
        seed: config.seed,
    };

    let events = EventEmitter::new(&config.output_dir.join(domain));
    let mut summary = DomainSummary {
        domain: domain.to_string(),
        ..Default::default()
    };

    for &level in &config.observability_levels {
        let plans_dir = config.plans_dir(domain, level);
        if !plans_dir.exists() {
            tracing::warn!(plans = %plans_dir.display(), "Plans directory missing; skipping level");
            continue;
        }

        let out_dir = config.cell_output_dir(domain, level);
        std::fs::create_dir_all(&out_dir)?;
        let mut analysis = serde_json::Map::new();

        for &rate in &config.attack_rates {
            let scratch_root = config
                .scratch_dir
                .join(domain)
                .join(level.to_string())
                .join(rate.to_string());
            let failures_dir = out_dir.join("failures");

            let report = process_cell(
                &ctx,
                &plans_dir,
                &scratch_root,
                level,
                rate,
                Some(&events),
                Some(&failures_dir),
            )
            .await?;

            let records_path = out_dir.join(format!("{rate}_mask.json"));
            std::fs::write(
                &records_path,
                serde_json::to_string_pretty(&report.records)?,
            )?;

            tracing::info!(
                level,
                rate,
                ok = report.records.len(),
                failed = report.failures.len(),
                actual_atk_perc = report.actual_attack_percent(),
                "Cell complete"
            );
            let _ = events.emit_simple(
                "cell_done",
                &format!(
                    "{domain}/{level} rate {rate}: {} ok, {} failed",
                    report.records.len(),
                    report.failures.len()
                ),
            );

            analysis.insert(rate.to_string(), report.analysis_json());
            summary.cells += 1;
            summary.items_ok += report.records.len();
            summary.items_failed += report.failures.len();
        }

        std::fs::write(
            out_dir.join("atk_analysis.json"),
            serde_json::to_string_pretty(&Value::Object(analysis))?,
        )?;
    }

    Ok(summary)
}

/// Whole-run totals.
#[derive(Debug, Default, Serialize)]
pub struct RunSummary {
    pub domains_ok: usize,
    pub domains_failed: usize,
    pub cells: usize,
    pub items_ok: usize,
    pub items_failed: usize,
}

/// Drive every configured domain. A domain that fails outright (unreadable
/// vocabulary, unreadable corpus) is logged and skipped; the run always
/// completes and reports what succeeded.
pub async fn run(config: &GeneratorConfig, grounder: &dyn Grounder) -> RunSummary {
    let mut summary = RunSummary::default();

    for domain in &config.domains {
        match run_domain(config, grounder, domain).await {
            Ok(domain_summary) => {
                summary.domains_ok += 1;
                summary.cells += domain_summary.cells;
                summary.items_ok += domain_summary.items_ok;
                summary.items_failed += domain_summary.items_failed;
            }
            Err(error) => {
                tracing::error!(domain = %domain, %error, "Domain failed; continuing with next");
                summary.domains_failed += 1;
            }
        }
    }

    summary
}

/// Token sets accumulated by a corpus scan.
#[derive(Debug, Default)]
pub struct CorpusTokens {
    pub actions: HashSet<String>,
    pub goal_predicates: HashSet<String>,
}

/// Scan one domain's full-observability corpus for vocabulary tokens.
///
/// Observation and goal files are load-bearing: an unreadable one aborts the
/// scan, since a vocabulary missing their tokens would poison every later
/// encoding run. Grounded actions only widen the action set, so grounding
/// errors are logged and skipped.
pub async fn scan_corpus(
    plans_dir: &Path,
    scratch_root: &Path,
    format: CorpusFormat,
    grounder: &dyn Grounder,
) -> Result<CorpusTokens> {
    let archives = list_archives(plans_dir)?;
    tracing::info!(plans = %plans_dir.display(), items = archives.len(), "Scanning corpus");

    let mut tokens = CorpusTokens::default();

    for (index, archive) in archives.iter().enumerate() {
        let scratch = scratch_root.join(format!("item-{index}"));
        let result = scan_item(archive, &scratch, format, grounder, &mut tokens).await;
        let _ = std::fs::remove_dir_all(&scratch);
        result?;
    }

    Ok(tokens)
}

async fn scan_item(
    archive: &Path,
    scratch: &Path,
    format: CorpusFormat,
    grounder: &dyn Grounder,
    tokens: &mut CorpusTokens,
) -> Result<()> {
    let workspace = Workspace::extract(archive, scratch)?;

    for observation in corpus::read_observations(workspace.root())? {
        tokens.actions.insert(observation.to_uppercase());
    }

    for hypothesis in corpus::read_hypotheses(workspace.root(), format)? {
        for predicate in hypothesis {
            let predicate = predicate.trim().to_uppercase();
            if !predicate.is_empty() {
                tokens.goal_predicates.insert(predicate);
            }
        }
    }
    for predicate in corpus::read_real_goal(workspace.root(), format)? {
        let predicate = predicate.trim().to_uppercase();
        if !predicate.is_empty() {
            tokens.goal_predicates.insert(predicate);
        }
    }

    match ground_universe(&workspace, grounder).await {
        Ok(pool) => {
            for action in pool {
                tokens.actions.insert(action.to_uppercase());
            }
        }
        Err(error) => {
            tracing::warn!(item = %item_name(archive), %error, "Grounding skipped during corpus scan");
        }
    }

    Ok(())
}

async fn ground_universe(workspace: &Workspace, grounder: &dyn Grounder) -> Result<Vec<String>> {
    let template = corpus::read_template(workspace.root())?;
    let goal_line = corpus::read_real_goal_line(workspace.root())?;
    let problem = pddl::write_problem(workspace.root(), &template, &goal_line)?;
    let instances = grounder.ground(&workspace.domain_file(), &problem).await?;
    Ok(normalize_instances(&instances))
}

/// Build and persist the vocabulary pair for one domain from its
/// full-observability corpus.
pub async fn build_vocabularies(
    config: &GeneratorConfig,
    grounder: &dyn Grounder,
    domain: &str,
) -> Result<(Vocabulary, Vocabulary)> {
    let plans_dir = config.plans_dir(domain, FULL_OBSERVABILITY_LEVEL);
    let scratch_root = config.scratch_dir.join(domain).join("vocab-scan");

    let tokens = scan_corpus(&plans_dir, &scratch_root, config.format, grounder).await?;
    let actions = Vocabulary::build(tokens.actions);
    let goals = Vocabulary::build(tokens.goal_predicates);

    actions.save(&config.action_vocab_path(domain))?;
    goals.save(&config.goal_vocab_path(domain))?;
    tracing::info!(
        domain,
        actions = actions.len(),
        goal_predicates = goals.len(),
        "Vocabularies built"
    );

    Ok((actions, goals))
}
