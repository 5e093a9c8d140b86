/// A value that successful chunk payloads can be folded into.
///
/// Implement this for the combined result type of a run. Merging happens in
/// the order chunks complete, not the order they were submitted.
pub trait Merge<P> {
    fn merge(&mut self, payload: P);
}

impl<P> Merge<P> for Vec<P> {
    fn merge(&mut self, payload: P) {
        self.push(payload);
    }
}

/// Owns the accumulated value of one run and counts what went into it.
#[derive(Debug, Default)]
pub struct Aggregator<A> {
    value: A,
    merged: usize,
}

impl<A> Aggregator<A> {
    pub const fn new(value: A) -> Self {
        Self { value, merged: 0 }
    }

    /// Folds one successful payload into the accumulated value.
    pub fn merge<P>(&mut self, payload: P)
    where
        A: Merge<P>,
    {
        self.value.merge(payload);
        self.merged += 1;
    }

    /// Number of payloads merged so far.
    pub const fn merged(&self) -> usize {
        self.merged
    }

    pub const fn get(&self) -> &A {
        &self.value
    }

    pub fn into_inner(self) -> A {
        self.value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Totals {
        ids: Vec<u32>,
        records: usize,
    }

    impl Merge<(u32, usize)> for Totals {
        fn merge(&mut self, (id, records): (u32, usize)) {
            self.ids.push(id);
            self.records += records;
        }
    }

    #[test]
    fn merges_in_arrival_order() {
        let mut agg = Aggregator::<Vec<&str>>::default();
        agg.merge("second");
        agg.merge("first");
        assert_eq!(agg.merged(), 2);
        assert_eq!(agg.into_inner(), vec!["second", "first"]);
    }

    #[test]
    fn custom_merge_accumulates() {
        let mut agg = Aggregator::new(Totals::default());
        agg.merge((7, 100));
        agg.merge((3, 50));
        assert_eq!(agg.get().ids, vec![7, 3]);
        assert_eq!(agg.get().records, 150);
    }
}
