use crate::alignment::Aligner;
use crate::config::ConsensusConfig;
use crate::consensus::select_consensus;
use crate::constants::PROGRESS_LOG_INTERVAL;
use crate::error::{RefconsError, Result};
use crate::read_filter::filter_read;
use crate::reconcile::Reconciler;
use crate::record_source::AlignmentRecordSource;
use crate::tally::FrequencyTable;
use crate::types::*;
use crossbeam_channel::bounded;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Instant;

/// Frequency table and filter counters for one run.
#[derive(Debug, Clone, Default)]
pub struct TallyOutput {
    pub table: FrequencyTable,
    pub summary: FilterSummary,
}

#[derive(Debug, Clone, Default)]
pub struct ConsensusRun {
    pub consensus: ConsensusSequence,
    pub summary: FilterSummary,
}

/// Drives the read filter over a worker pool and tallies the results.
///
/// Topology:
///      producer  --work (bounded: workers)-->  worker x N
///      worker x N  --results (bounded: 2N)-->  calling thread (tally owner)
pub struct Pipeline {
    config: ConsensusConfig,
    error_flag: AtomicBool,
}

impl Pipeline {
    pub fn new(config: ConsensusConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            error_flag: AtomicBool::new(false),
        })
    }

    /// Sets the flag the pipeline threads poll. Cancellation is sticky: any
    /// later `tally` on this pipeline returns [`RefconsError::Cancelled`].
    pub fn cancel(&self) {
        self.error_flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.error_flag.load(Ordering::Relaxed)
    }

    pub fn tally<S: AlignmentRecordSource>(&self, source: &S) -> Result<TallyOutput> {
        let start = Instant::now();
        let total = source.count()?;
        let config = &self.config;
        let error_flag = &self.error_flag;
        log::info!(
            "Tallying {} reads with {} workers (chunk size {}, batch size {})",
            total,
            config.worker_count,
            config.chunk_size,
            config.producer_batch_size
        );

        let (work_tx, work_rx) = bounded::<Vec<ReadRecord>>(config.worker_count);
        let (result_tx, result_rx) = bounded::<Vec<FilterOutcome>>(config.worker_count * 2);

        let mut output = TallyOutput::default();
        let produced = thread::scope(|s| {
            let producer = s.spawn(move || -> Result<usize> {
                let mut sent = 0;
                let mut offset = 0;
                while offset < total {
                    if error_flag.load(Ordering::Relaxed) {
                        break;
                    }
                    let batch = match source.fetch(offset, config.producer_batch_size) {
                        Ok(batch) => batch,
                        Err(e) => {
                            error_flag.store(true, Ordering::SeqCst);
                            return Err(e);
                        }
                    };
                    if batch.is_empty() {
                        log::warn!("Record source ran dry at offset {} of {}", offset, total);
                        break;
                    }
                    offset += config.producer_batch_size;

                    let chunk_capacity = config.chunk_size.min(batch.len());
                    let mut chunk = Vec::with_capacity(chunk_capacity);
                    for record in batch.into_iter() {
                        chunk.push(record);
                        if chunk.len() == config.chunk_size {
                            sent += chunk.len();
                            let full = std::mem::replace(&mut chunk, Vec::with_capacity(chunk_capacity));
                            if work_tx.send(full).is_err() {
                                return Ok(sent);
                            }
                        }
                    }
                    if !chunk.is_empty() {
                        sent += chunk.len();
                        if work_tx.send(chunk).is_err() {
                            return Ok(sent);
                        }
                    }
                }
                drop(work_tx);
                log::debug!("Producer finished after {} reads.", sent);
                Ok(sent)
            });

            for _ in 0..config.worker_count {
                let rx = work_rx.clone();
                let tx = result_tx.clone();
                s.spawn(move || {
                    while let Ok(chunk) = rx.recv() {
                        if error_flag.load(Ordering::Relaxed) {
                            break;
                        }
                        let outcomes = chunk
                            .iter()
                            .map(|read| filter_read(read, config))
                            .collect::<Vec<_>>();
                        if tx.send(outcomes).is_err() {
                            break;
                        }
                    }
                    log::trace!("Worker finished.");
                });
            }
            drop(work_rx);
            drop(result_tx);

            let mut next_report = PROGRESS_LOG_INTERVAL;
            for outcomes in result_rx.iter() {
                for outcome in outcomes.iter() {
                    output.summary.record(outcome);
                    if let Ok(call) = outcome {
                        output.table.add_call(call);
                    }
                }
                if output.summary.total_reads >= next_report {
                    log::debug!("Processed {} reads.", output.summary.total_reads);
                    next_report += PROGRESS_LOG_INTERVAL;
                }
            }

            producer
                .join()
                .map_err(|_| RefconsError::PipelineDisconnected("producer panicked".to_string()))?
        })?;

        if self.is_cancelled() {
            return Err(RefconsError::Cancelled);
        }
        if produced != output.summary.total_reads || produced != total {
            return Err(RefconsError::PipelineDisconnected(format!(
                "expected {} reads, produced {}, tallied {}",
                total, produced, output.summary.total_reads
            )));
        }

        let summary = &output.summary;
        log::info!(
            "Tallied {} of {} reads in {:?} ({} too short, {} low overall quality, {} low quality sites dropped)",
            summary.tallied_reads,
            summary.total_reads,
            start.elapsed(),
            summary.too_short,
            summary.low_overall_quality,
            summary.low_site_quality_sites
        );
        Ok(output)
    }

    pub fn build_consensus<S: AlignmentRecordSource>(
        &self,
        source: &S,
        reference: &[u8],
    ) -> Result<ConsensusRun> {
        let tally = self.tally(source)?;
        let consensus = select_consensus(&tally.table, reference);
        Ok(ConsensusRun {
            consensus,
            summary: tally.summary,
        })
    }

    /// Builds the consensus against `reference` and maps it back onto
    /// `original`. A reconciliation failure cancels the pipeline, so it cannot
    /// be reused for another round.
    pub fn build_and_reconcile<S: AlignmentRecordSource, A: Aligner>(
        &self,
        source: &S,
        reference: &[u8],
        original: &[u8],
        reconciler: &Reconciler<A>,
    ) -> Result<(ConsensusRun, ReconciliationResult)> {
        let run = self.build_consensus(source, reference)?;
        match reconciler.reconcile(original, &run.consensus) {
            Ok(reconciled) => Ok((run, reconciled)),
            Err(e) => {
                self.cancel();
                Err(e)
            }
        }
    }
}
