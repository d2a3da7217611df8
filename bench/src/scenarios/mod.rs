//! Page access patterns

use clockpool::types::PageId;
use rand::Rng;
use rand::rngs::StdRng;

/// Scenario trait - picks the page each operation touches
pub trait Scenario: Send + Sync {
    /// Page touched by operation number `step`
    fn next_page(&self, step: u64, rng: &mut StdRng) -> PageId;

    /// Scenario name for the report
    fn name(&self) -> &str;
}

/// Every page equally likely
pub struct Uniform {
    pages: u64,
}

impl Uniform {
    pub fn new(pages: u64) -> Self {
        Self { pages }
    }
}

impl Scenario for Uniform {
    fn next_page(&self, _step: u64, rng: &mut StdRng) -> PageId {
        rng.gen_range(0..self.pages)
    }

    fn name(&self) -> &str {
        "uniform"
    }
}

/// A small hot set takes most of the accesses
pub struct HotCold {
    pages: u64,
    hot_pages: u64,
    hot_probability: f64,
}

impl HotCold {
    /// `hot_fraction` of the pages receive `hot_probability` of the accesses
    pub fn new(pages: u64, hot_fraction: f64, hot_probability: f64) -> Self {
        let hot_pages = ((pages as f64 * hot_fraction) as u64).clamp(1, pages);
        Self {
            pages,
            hot_pages,
            hot_probability,
        }
    }
}

impl Scenario for HotCold {
    fn next_page(&self, _step: u64, rng: &mut StdRng) -> PageId {
        if self.hot_pages == self.pages || rng.gen_bool(self.hot_probability) {
            rng.gen_range(0..self.hot_pages)
        } else {
            rng.gen_range(self.hot_pages..self.pages)
        }
    }

    fn name(&self) -> &str {
        "hot_cold"
    }
}

/// Sequential scan wrapping around the store
pub struct Scan {
    pages: u64,
}

impl Scan {
    pub fn new(pages: u64) -> Self {
        Self { pages }
    }
}

impl Scenario for Scan {
    fn next_page(&self, step: u64, _rng: &mut StdRng) -> PageId {
        step % self.pages
    }

    fn name(&self) -> &str {
        "scan"
    }
}

/// Builds a scenario by name
pub fn from_name(name: &str, pages: u64) -> Option<Box<dyn Scenario>> {
    match name {
        "uniform" => Some(Box::new(Uniform::new(pages))),
        "hot_cold" => Some(Box::new(HotCold::new(pages, 0.1, 0.9))),
        "scan" => Some(Box::new(Scan::new(pages))),
        _ => None,
    }
}
