//! One controller per sequence id, created on first use.

use std::collections::BTreeMap;

use staircase_traits::ProtocolSink;

use crate::config::RunCfg;
use crate::controller::SequenceController;
use crate::error::Result;
use crate::estimate::Estimate;
use crate::status::AdvanceOutcome;
use crate::trial::{TrialList, TrialRecord};

/// Creates the protocol sink for a newly created sequence.
pub type ProtocolFactory = Box<dyn Fn(i64) -> Box<dyn ProtocolSink>>;

pub struct SequenceRegistry {
    run: RunCfg,
    sequences: BTreeMap<i64, SequenceController>,
    protocol: Option<ProtocolFactory>,
}

impl core::fmt::Debug for SequenceRegistry {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SequenceRegistry")
            .field("sequences", &self.sequences)
            .field("protocol", &self.protocol.is_some())
            .finish_non_exhaustive()
    }
}

impl SequenceRegistry {
    pub fn new(run: RunCfg) -> Self {
        Self {
            run,
            sequences: BTreeMap::new(),
            protocol: None,
        }
    }

    /// Sinks for sequences with `protocol` enabled; without a factory they
    /// log through `TracingSink`.
    #[must_use]
    pub fn with_protocol_factory(mut self, factory: ProtocolFactory) -> Self {
        self.protocol = Some(factory);
        self
    }

    pub fn run_cfg(&self) -> &RunCfg {
        &self.run
    }

    /// Only positive ids name adaptive sequences.
    pub const fn is_recognized(sequence_id: i64) -> bool {
        sequence_id >= 1
    }

    pub fn get(&self, sequence_id: i64) -> Option<&SequenceController> {
        self.sequences.get(&sequence_id)
    }

    pub fn len(&self) -> usize {
        self.sequences.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sequences.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SequenceController> {
        self.sequences.values()
    }

    pub fn get_or_create(&mut self, sequence_id: i64) -> Result<&mut SequenceController> {
        if !self.sequences.contains_key(&sequence_id) {
            let settings = self.run.sequence(sequence_id).clone();
            let mut builder = SequenceController::builder(sequence_id)
                .with_responses(self.run.responses)
                .with_step(self.run.step)
                .with_fit(self.run.fit);
            if settings.protocol
                && let Some(factory) = &self.protocol
            {
                builder = builder.with_protocol_sink(factory(sequence_id));
            }
            let controller = builder.with_settings(settings).build()?;
            self.sequences.insert(sequence_id, controller);
        }
        self.sequences
            .get_mut(&sequence_id)
            .ok_or_else(|| eyre::eyre!("sequence {sequence_id} vanished from registry"))
    }

    /// Whether the runner should present `trial`.
    ///
    /// Trials of unrecognized ids are always executed; a sequence that has
    /// not been advanced yet runs while its trial state is non-negative.
    pub fn exec_trial(&self, trial: &TrialRecord) -> bool {
        if !Self::is_recognized(trial.sequence_id) {
            return true;
        }
        self.sequences
            .get(&trial.sequence_id)
            .map_or(trial.state >= 0, |c| c.exec_trial(trial))
    }

    /// Advance the sequence owning the trial at `current`.
    ///
    /// `Ok(None)` when the trial belongs to no adaptive sequence.
    pub fn advance<L: TrialList + ?Sized>(
        &mut self,
        trials: &mut L,
        current: usize,
    ) -> Result<Option<AdvanceOutcome>> {
        let Some(id) = trials.trial(current).map(|t| t.sequence_id) else {
            return Err(eyre::Report::new(crate::error::StaircaseError::TrialIndex {
                index: current,
                len: trials.len(),
            }));
        };
        if !Self::is_recognized(id) {
            return Ok(None);
        }
        let controller = self.get_or_create(id)?;
        controller.advance(trials, current).map(Some)
    }

    /// Estimate every adaptive sequence present in `trials`, in id order.
    pub fn estimate_all<L: TrialList + ?Sized>(&mut self, trials: &mut L) -> Result<Vec<Estimate>> {
        let mut ids: Vec<i64> = (0..trials.len())
            .filter_map(|i| trials.trial(i).map(|t| t.sequence_id))
            .filter(|id| Self::is_recognized(*id))
            .collect();
        ids.sort_unstable();
        ids.dedup();

        let mut out = Vec::with_capacity(ids.len());
        for id in ids {
            let controller = self.get_or_create(id)?;
            out.push(controller.estimate(trials)?);
        }
        Ok(out)
    }
}
