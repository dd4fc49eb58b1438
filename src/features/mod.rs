//! Calendar feature enrichment.
//!
//! An [`Enricher`] is built once per run from the configuration and then used
//! for both history and future dates, so the two always share one column
//! order. Rows are independent and are enriched in parallel; output order
//! matches input order.

use chrono::{Datelike, NaiveDate};
use rayon::prelude::*;
use rust_decimal::Decimal;
use tracing::debug;

use crate::calendar::{self, HolidayTable};
use crate::config::PipelineConfig;
use crate::domain::{EnrichedBatch, EnrichedRecord, FeatureColumn, SalesRecord};
use crate::error::ForecastError;

#[derive(Debug, Clone)]
pub struct Enricher {
    columns: Vec<FeatureColumn>,
    region: String,
    holidays: HolidayTable,
    islamic_festivals: Vec<(u32, u32)>,
}

impl Enricher {
    pub fn new(region: impl Into<String>, holidays: HolidayTable) -> Self {
        Self {
            columns: FeatureColumn::CORE.to_vec(),
            region: region.into(),
            holidays,
            islamic_festivals: Vec::new(),
        }
    }

    /// Append an `is_islamic_festival` column for the given Hijri `(month, day)` pairs.
    pub fn with_islamic_festivals(mut self, festivals: Vec<(u32, u32)>) -> Self {
        if !self.columns.contains(&FeatureColumn::IsIslamicFestival) {
            self.columns.push(FeatureColumn::IsIslamicFestival);
        }
        self.islamic_festivals = festivals;
        self
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        let holidays = HolidayTable::builtin().with_extra(&config.holidays);
        let enricher = Self::new(config.region.trim(), holidays);
        if config.features.islamic_festival_column {
            enricher.with_islamic_festivals(config.features.islamic_festivals.clone())
        } else {
            enricher
        }
    }

    pub fn columns(&self) -> &[FeatureColumn] {
        &self.columns
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    pub fn holidays(&self) -> &HolidayTable {
        &self.holidays
    }

    /// Hijri `(month, day)` pairs behind `is_islamic_festival` (empty when the column is off).
    pub fn islamic_festivals(&self) -> &[(u32, u32)] {
        &self.islamic_festivals
    }

    /// Feature vector for a single date.
    pub fn features_for(&self, date: NaiveDate) -> Result<Vec<f64>, ForecastError> {
        let gregorian = calendar::gregorian(date);
        let islamic = calendar::to_islamic(date)?;
        let hindu = calendar::to_hindu_civil(date)?;

        let row = self
            .columns
            .iter()
            .map(|column| match column {
                FeatureColumn::GregorianYear => f64::from(gregorian.year),
                FeatureColumn::GregorianMonth => f64::from(gregorian.month),
                FeatureColumn::GregorianDay => f64::from(gregorian.day),
                FeatureColumn::DayOfWeek => f64::from(date.weekday().num_days_from_monday()),
                FeatureColumn::IslamicYear => f64::from(islamic.year),
                FeatureColumn::IslamicMonth => f64::from(islamic.month),
                FeatureColumn::IslamicDay => f64::from(islamic.day),
                FeatureColumn::HinduYear => f64::from(hindu.year),
                FeatureColumn::HinduMonth => f64::from(hindu.month),
                FeatureColumn::HinduDay => f64::from(hindu.day),
                FeatureColumn::IsHoliday => flag(self.holidays.contains(date, &self.region)),
                FeatureColumn::IsIslamicFestival => flag(
                    self.islamic_festivals
                        .iter()
                        .any(|&(m, d)| islamic.month == m && islamic.day == d),
                ),
            })
            .collect();
        Ok(row)
    }

    /// Enrich dates with no observed amount (forecast horizon).
    pub fn enrich(&self, dates: &[NaiveDate]) -> Result<EnrichedBatch, ForecastError> {
        self.enrich_rows(dates.iter().map(|&date| (date, None)).collect())
    }

    /// Enrich the normalized history, carrying each record's amount along.
    pub fn enrich_history(&self, records: &[SalesRecord]) -> Result<EnrichedBatch, ForecastError> {
        self.enrich_rows(records.iter().map(|r| (r.date, Some(r.amount))).collect())
    }

    fn enrich_rows(&self, rows: Vec<(NaiveDate, Option<Decimal>)>) -> Result<EnrichedBatch, ForecastError> {
        let records = rows
            .into_par_iter()
            .map(|(date, amount)| {
                Ok(EnrichedRecord {
                    date,
                    amount,
                    features: self.features_for(date)?,
                })
            })
            .collect::<Result<Vec<_>, ForecastError>>()?;

        debug!(rows = records.len(), columns = self.columns.len(), "enriched");
        Ok(EnrichedBatch {
            columns: self.columns.clone(),
            records,
        })
    }
}

fn flag(value: bool) -> f64 {
    if value { 1.0 } else { 0.0 }
}
