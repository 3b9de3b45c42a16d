use crate::Op;

/// Equi-width histogram over an integer column, used to estimate the
/// selectivity of a comparison against a constant.
///
/// The value domain [min, max] is split into buckets of width
/// max((max - min + 1) / buckets, 1); when the domain does not divide
/// evenly the last bucket absorbs the remainder.
pub struct IntHistogram {
    min: i64,
    max: i64,
    bucket_width: i64,
    buckets: Vec<usize>,
    total: usize,
}

impl IntHistogram {
    pub fn new(bucket_count: usize, min: i32, max: i32) -> Self {
        let min = min as i64;
        let max = max as i64;
        let bucket_width = ((max - min + 1) / bucket_count as i64).max(1);

        Self {
            min,
            max,
            bucket_width,
            buckets: vec![0; bucket_count],
            total: 0,
        }
    }

    fn bucket_of(&self, v: i64) -> usize {
        let index = ((v - self.min) / self.bucket_width) as usize;
        index.min(self.buckets.len() - 1)
    }

    /// Record one value. Values outside [min, max] are ignored.
    pub fn add_value(&mut self, v: i32) {
        let v = v as i64;
        if v < self.min || v > self.max {
            return;
        }

        let index = self.bucket_of(v);
        self.buckets[index] += 1;
        self.total += 1;
    }

    /// Estimated fraction of recorded values satisfying `value op v`,
    /// clamped to [0, 1].
    pub fn estimate_selectivity(&self, op: Op, v: i32) -> f64 {
        let v = v as i64;
        let selectivity = match op {
            Op::Equals => self.selectivity_eq(v),
            Op::NotEquals => 1.0 - self.selectivity_eq(v),
            Op::GreaterThan => self.selectivity_gt(v),
            Op::GreaterThanOrEq => self.selectivity_gt(v - 1),
            Op::LessThan => 1.0 - self.selectivity_gt(v - 1),
            Op::LessThanOrEq => 1.0 - self.selectivity_gt(v),
        };

        selectivity.max(0.0).min(1.0)
    }

    // Values of v's bucket are assumed uniformly spread over the
    // bucket's width.
    fn selectivity_eq(&self, v: i64) -> f64 {
        if self.total == 0 || v < self.min || v > self.max {
            return 0.0;
        }

        let height = self.buckets[self.bucket_of(v)] as f64;
        height / self.bucket_width as f64 / self.total as f64
    }

    fn selectivity_gt(&self, v: i64) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        if v < self.min {
            return 1.0;
        }
        if v >= self.max {
            return 0.0;
        }

        let index = self.bucket_of(v);
        let right_edge = self.min + (index as i64 + 1) * self.bucket_width;
        let height = self.buckets[index] as f64;

        // the fraction of v's bucket above v, plus every bucket to
        // the right in full
        let mut selectivity = (height / self.total as f64)
            * ((right_edge - v) as f64 / self.bucket_width as f64);
        for i in (index + 1)..self.buckets.len() {
            selectivity += self.buckets[i] as f64 / self.total as f64;
        }
        selectivity
    }
}
