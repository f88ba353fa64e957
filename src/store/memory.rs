use crate::{
    declare::Quote,
    error::StoreError,
    store::{Series, SeriesStore},
};

/// 只存在記憶體的報價序列
pub struct MemoryStore {
    series: Series,
}

impl MemoryStore {
    pub fn new(retention: usize) -> Self {
        MemoryStore {
            series: Series::new(Vec::new(), retention),
        }
    }
}

impl SeriesStore for MemoryStore {
    fn append(&self, quote: Quote) -> Result<Quote, StoreError> {
        self.series.append_with(quote, |_| Ok(()))
    }

    fn latest(&self) -> Option<Quote> {
        self.series.latest()
    }

    fn history(&self) -> Vec<Quote> {
        self.series.history()
    }

    fn len(&self) -> usize {
        self.series.len()
    }
}
