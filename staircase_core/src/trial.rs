//! Trial records and the trial-list seam.

/// One trial in the externally owned trial list.
///
/// `turnpoint_counter` and `results` are optional columns: a list that does
/// not carry them holds `None`, and the engine reports a missing field instead
/// of writing.
#[derive(Debug, Clone, PartialEq)]
pub struct TrialRecord {
    pub sequence_id: i64,
    pub trial_counter: i64,
    /// Non-negative while running, negated at and after termination.
    pub state: i64,
    pub parameter_value: f64,
    pub step_divisor: f64,
    pub turnpoint_counter: Option<i64>,
    pub response: i64,
    pub results: Option<Vec<f64>>,
}

impl TrialRecord {
    /// A fresh trial in the start state, carrying both optional columns.
    pub fn new(sequence_id: i64, parameter_value: f64, step_divisor: f64) -> Self {
        Self {
            sequence_id,
            trial_counter: 1,
            state: 0,
            parameter_value,
            step_divisor,
            turnpoint_counter: Some(0),
            response: 0,
            results: Some(Vec::new()),
        }
    }

    #[must_use]
    pub fn without_turnpoint_counter(mut self) -> Self {
        self.turnpoint_counter = None;
        self
    }

    #[must_use]
    pub fn without_results(mut self) -> Self {
        self.results = None;
        self
    }

    #[must_use]
    pub fn with_response(mut self, response: i64) -> Self {
        self.response = response;
        self
    }

    #[must_use]
    pub fn with_state(mut self, state: i64) -> Self {
        self.state = state;
        self
    }
}

/// Ordered, externally owned list of trials.
///
/// The engine only needs indexed access and removal; everything else is
/// provided on top of that.
pub trait TrialList {
    fn len(&self) -> usize;
    fn trial(&self, index: usize) -> Option<&TrialRecord>;
    fn trial_mut(&mut self, index: usize) -> Option<&mut TrialRecord>;
    fn remove(&mut self, index: usize) -> Option<TrialRecord>;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Index of the first trial of `sequence_id` after `after`.
    fn next_of_sequence(&self, after: usize, sequence_id: i64) -> Option<usize> {
        (after + 1..self.len())
            .find(|&i| self.trial(i).is_some_and(|t| t.sequence_id == sequence_id))
    }

    /// Indices of every trial of `sequence_id`, in list order.
    fn indices_of_sequence(&self, sequence_id: i64) -> Vec<usize> {
        (0..self.len())
            .filter(|&i| self.trial(i).is_some_and(|t| t.sequence_id == sequence_id))
            .collect()
    }

    /// Remove every trial of `sequence_id` after `after`; returns how many.
    fn remove_after(&mut self, after: usize, sequence_id: i64) -> usize {
        let doomed: Vec<usize> = (after + 1..self.len())
            .filter(|&i| self.trial(i).is_some_and(|t| t.sequence_id == sequence_id))
            .collect();
        for &i in doomed.iter().rev() {
            self.remove(i);
        }
        doomed.len()
    }
}

impl TrialList for Vec<TrialRecord> {
    fn len(&self) -> usize {
        <[TrialRecord]>::len(self)
    }

    fn trial(&self, index: usize) -> Option<&TrialRecord> {
        self.get(index)
    }

    fn trial_mut(&mut self, index: usize) -> Option<&mut TrialRecord> {
        self.get_mut(index)
    }

    fn remove(&mut self, index: usize) -> Option<TrialRecord> {
        (index < <[TrialRecord]>::len(self)).then(|| Vec::remove(self, index))
    }
}

/// Build an interleaved list: `per_sequence` trials of each id, round-robin,
/// every trial starting from `start_value`/`start_divisor` of its sequence.
pub fn interleaved(starts: &[(i64, f64, f64)], per_sequence: u32) -> Vec<TrialRecord> {
    let mut trials = Vec::with_capacity(starts.len() * per_sequence as usize);
    for _ in 0..per_sequence {
        for &(id, value, divisor) in starts {
            trials.push(TrialRecord::new(id, value, divisor));
        }
    }
    trials
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn next_of_sequence_skips_other_ids() {
        let list = interleaved(&[(1, 0.0, 1.0), (2, 5.0, 1.0)], 3);
        assert_eq!(list.len(), 6);
        assert_eq!(list.next_of_sequence(0, 1), Some(2));
        assert_eq!(list.next_of_sequence(1, 2), Some(3));
        assert_eq!(list.next_of_sequence(4, 1), None);
    }

    #[test]
    fn remove_after_only_touches_one_sequence() {
        let mut list = interleaved(&[(1, 0.0, 1.0), (2, 5.0, 1.0)], 4);
        let removed = list.remove_after(2, 1);
        assert_eq!(removed, 2);
        assert_eq!(list.indices_of_sequence(1), vec![0, 2]);
        assert_eq!(list.indices_of_sequence(2).len(), 4);
    }

    #[test]
    fn remove_out_of_range_is_none() {
        let mut list: Vec<TrialRecord> = Vec::new();
        assert!(TrialList::remove(&mut list, 0).is_none());
        assert!(TrialList::is_empty(&list));
    }
}
