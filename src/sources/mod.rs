//! Per-platform transaction acquisition.
//!
//! Every platform is reached through the [`Source`] trait so the worker (and
//! the tests) never care whether rows came from a REST API, a gateway export
//! or a fixture.

pub mod cdp;
pub mod janis;
pub mod payway;
pub mod vtex;

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, NaiveDate, Utc};

use crate::types::{Platform, PlatformBatch, Report};
use crate::Config;

pub use cdp::{CdpExportFetcher, CdpHttpFetcher, CdpSource};
pub use janis::{JanisApi, JanisHttpApi, JanisSource};
pub use payway::{PaywayGateway, PaywayHttpGateway, PaywaySource};
pub use vtex::{VtexApi, VtexHttpApi, VtexSource};

#[async_trait]
pub trait Source: Send + Sync {
    fn platform(&self) -> Platform;

    /// Acquire every transaction of the report's date range. The batch is
    /// complete or the call fails; partial acquisitions are never returned.
    async fn fetch(&self, report: &Report) -> Result<PlatformBatch>;
}

/// One source per platform, built once at startup.
#[derive(Clone)]
pub struct SourceSet {
    vtex: Arc<dyn Source>,
    payway: Arc<dyn Source>,
    cdp: Arc<dyn Source>,
    janis: Arc<dyn Source>,
}

impl SourceSet {
    pub fn new(
        vtex: Arc<dyn Source>,
        payway: Arc<dyn Source>,
        cdp: Arc<dyn Source>,
        janis: Arc<dyn Source>,
    ) -> Self {
        Self {
            vtex,
            payway,
            cdp,
            janis,
        }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self::new(
            Arc::new(VtexSource::new(Arc::new(VtexHttpApi::from_config(
                config,
            )?))),
            Arc::new(PaywaySource::new(Arc::new(PaywayHttpGateway::from_config(
                config,
            )?))),
            Arc::new(CdpSource::new(Arc::new(CdpHttpFetcher::from_config(
                config,
            )?))),
            Arc::new(JanisSource::new(Arc::new(JanisHttpApi::from_config(
                config,
            )?))),
        ))
    }

    pub fn for_platform(&self, platform: Platform) -> &dyn Source {
        match platform {
            Platform::Vtex => self.vtex.as_ref(),
            Platform::Payway => self.payway.as_ref(),
            Platform::Cdp => self.cdp.as_ref(),
            Platform::Janis => self.janis.as_ref(),
        }
    }
}

/// Buenos Aires offset. Argentina has not observed DST since 2009, so a
/// fixed offset is exact for every range this service is asked about.
pub(crate) fn argentina_offset() -> FixedOffset {
    FixedOffset::west_opt(3 * 3600).expect("static offset")
}

/// Widen a local-date range to the UTC instants covering those days in
/// Argentina time: `[start 00:00:00-03, end 23:59:59-03]`.
pub(crate) fn range_to_utc(start: NaiveDate, end: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    let offset = argentina_offset();
    let from = start
        .and_hms_opt(0, 0, 0)
        .expect("valid time")
        .and_local_timezone(offset)
        .single()
        .expect("fixed offset is unambiguous")
        .with_timezone(&Utc);
    let to = end
        .and_hms_opt(23, 59, 59)
        .expect("valid time")
        .and_local_timezone(offset)
        .single()
        .expect("fixed offset is unambiguous")
        .with_timezone(&Utc);
    (from, to)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_widens_to_utc_minus_three() {
        let (from, to) = range_to_utc(
            NaiveDate::from_ymd_opt(2024, 12, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 12, 1).unwrap(),
        );
        assert_eq!(from.to_rfc3339(), "2024-12-01T03:00:00+00:00");
        assert_eq!(to.to_rfc3339(), "2024-12-02T02:59:59+00:00");
    }
}
