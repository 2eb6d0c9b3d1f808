use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use log::{info, warn};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::app_config::Config;
use crate::database::DatabaseStats;
use crate::file_utils::FileManager;
use crate::subtitle_processor::SubtitleCollection;
use crate::text_processor::TextDocument;
use crate::translation::{AlignmentReport, BatchAligner, CacheStats, FragmentCache, TranslationService};

// @module: Per-document orchestration

/// Files written by a subtitle run
#[derive(Debug, Clone)]
pub struct SubtitleOutputs {
    pub translated: PathBuf,
    pub bilingual: PathBuf,
    pub report: AlignmentReport,
}

/// Drives one document: resolves paths, runs the pipeline, writes outputs
pub struct Controller {
    // @field: App configuration
    config: Config,
    service: TranslationService,
    cache: FragmentCache,
}

impl Controller {
    // @method: Build providers and open the document's cache
    pub fn with_config(config: Config) -> Result<Self> {
        let service = TranslationService::new(&config).context("Configuration validation failed")?;
        let cache = FragmentCache::open(config.document_dir())?;
        Ok(Self { config, service, cache })
    }

    /// Controller for cache maintenance; no provider is constructed
    pub fn for_maintenance(config: Config) -> Result<Self> {
        let service = TranslationService::with_links(&config, Vec::new());
        let cache = FragmentCache::open(config.document_dir())?;
        Ok(Self { config, service, cache })
    }

    /// Assemble a controller from prepared parts (mock providers in tests)
    pub fn from_parts(config: Config, service: TranslationService, cache: FragmentCache) -> Self {
        Self { config, service, cache }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn cache(&self) -> &FragmentCache {
        &self.cache
    }

    pub fn document_dir(&self) -> PathBuf {
        self.config.document_dir()
    }

    fn dry_run(&self) -> bool {
        self.config.translation.dry_run
    }

    fn announce(&self) {
        info!(
            "litrans: '{}' -> {} via {}",
            self.config.document_title,
            self.config.target_language,
            self.service.provider_names().join(" > ")
        );
        if self.dry_run() {
            warn!("Dry run mode enabled. No translation will be performed.");
        }
    }

    /// Translate an SRT file, writing the translated and bilingual copies
    pub async fn run_subtitles(&self, input_file: &Path) -> Result<SubtitleOutputs> {
        let start_time = Instant::now();
        self.announce();

        let subtitles = SubtitleCollection::load(input_file)?;
        let fragments = subtitles.texts();
        info!("Loaded {} subtitle entries", subtitles.len());

        let report = self.align_with_bar(&fragments, "chunks").await?;

        let dir = self.document_dir();
        let title = &self.config.document_title;
        let language = &self.config.target_language;
        let translated = FileManager::subtitle_output_path(&dir, title, language, false);
        let bilingual = FileManager::subtitle_output_path(&dir, title, language, true);

        subtitles.translated(&report.translations)?.write_to_srt(&translated)?;
        subtitles.bilingual(&report.translations)?.write_to_srt(&bilingual)?;

        self.log_report(&report, start_time.elapsed());
        info!("Success: {}", translated.display());
        info!("Success: {}", bilingual.display());

        Ok(SubtitleOutputs {
            translated,
            bilingual,
            report,
        })
    }

    /// Translate a TXT file group by group into `output.txt`
    pub async fn run_text(&self, input_file: &Path) -> Result<PathBuf> {
        let start_time = Instant::now();
        self.announce();

        let document = TextDocument::load(input_file, self.config.translation.text_group_chars)?;
        let progress_bar = progress_bar(document.groups.len() as u64, "groups");
        let pb = progress_bar.clone();

        let translated = document
            .translate(&self.service, &self.cache, self.dry_run(), move |done, _| {
                pb.set_position(done as u64);
            })
            .await?;
        progress_bar.finish_and_clear();

        let output_path = FileManager::text_output_path(self.document_dir());
        TextDocument::write_output(&output_path, &translated)?;

        info!(
            "Translated {} groups in {}",
            translated.len(),
            format_duration(start_time.elapsed())
        );
        info!("Success: {}", output_path.display());
        Ok(output_path)
    }

    /// Align a list of chapter titles (one per line) into a TSV mapping
    pub async fn run_titles(&self, input_file: &Path) -> Result<PathBuf> {
        let start_time = Instant::now();
        self.announce();

        let content = FileManager::read_to_string(input_file)?;
        let titles: Vec<String> = content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect();
        info!("Loaded {} titles", titles.len());

        let report = self.align_with_bar(&titles, "chunks").await?;

        let tsv: String = report
            .pairs(&titles)
            .map(|(source, translation)| format!("{}\t{}\n", tsv_field(source), tsv_field(translation)))
            .collect();

        let output_path =
            FileManager::titles_output_path(input_file, self.document_dir(), &self.config.target_language);
        FileManager::write_to_file(&output_path, &tsv)?;

        self.log_report(&report, start_time.elapsed());
        info!("Success: {}", output_path.display());
        Ok(output_path)
    }

    /// Hit/miss counters of this process plus the on-disk store
    pub fn cache_stats(&self) -> Result<(CacheStats, DatabaseStats)> {
        Ok((self.cache.stats()?, self.cache.database().stats()?))
    }

    /// Drop cached translations that fail the current heuristics
    pub fn revalidate_cache(&self) -> Result<usize> {
        let removed = self.cache.revalidate(self.service.validator())?;
        info!("Removed {} cached translations that no longer validate", removed);
        Ok(removed)
    }

    /// Drop alignment fallbacks so the next run retries them
    pub fn purge_unvalidated(&self) -> Result<usize> {
        let removed = self.cache.purge_unvalidated()?;
        info!("Removed {} unvalidated cache entries", removed);
        Ok(removed)
    }

    async fn align_with_bar(&self, fragments: &[String], unit: &str) -> Result<AlignmentReport> {
        let aligner = BatchAligner::new(&self.service, &self.cache, &self.config.translation);
        let progress_bar = progress_bar(0, unit);
        let pb = progress_bar.clone();

        let report = aligner
            .align_with_progress(fragments, self.dry_run(), move |done, total| {
                pb.set_length(total as u64);
                pb.set_position(done as u64);
            })
            .await?;

        progress_bar.finish_and_clear();
        Ok(report)
    }

    fn log_report(&self, report: &AlignmentReport, elapsed: Duration) {
        info!(
            "Aligned {} chunks in {}: {} cached, {} exact, {} repaired, {} fallbacks",
            report.chunks,
            format_duration(elapsed),
            report.cached,
            report.exact,
            report.repaired,
            report.fallbacks
        );
        if report.fallbacks > 0 {
            warn!(
                "{} chunks kept their source text; run again to retry them",
                report.fallbacks
            );
        }
    }
}

fn progress_bar(len: u64, unit: &str) -> ProgressBar {
    let progress_bar = ProgressBar::new(len);
    let style = ProgressStyle::default_bar()
        .template(&format!(
            "{{spinner:.green}} [{{elapsed_precise}}] [{{bar:40.cyan/blue}}] {{pos}}/{{len}} {} ({{percent}}%) {{eta}}",
            unit
        ))
        .or_else(|_| ProgressStyle::default_bar().template("{spinner} [{elapsed_precise}] [{bar:40}] {pos}/{len}"))
        .unwrap_or_else(|_| ProgressStyle::default_bar());
    progress_bar.set_style(style.progress_chars("█▓▒░"));
    progress_bar
}

fn tsv_field(text: &str) -> String {
    text.replace(['\t', '\n'], " ")
}

// Format duration in a human-readable format
fn format_duration(duration: Duration) -> String {
    let total_seconds = duration.as_secs();
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    if hours > 0 {
        format!("{}h {}m {}s", hours, minutes, seconds)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, seconds)
    } else {
        format!("{}.{:03}s", seconds, duration.subsec_millis())
    }
}
