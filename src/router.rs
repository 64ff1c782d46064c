//! Confidence router
//!
//! Picks exactly one handler for an inference result by its confidence.
//! Band bounds are exclusive lower bounds, checked from the highest down:
//! a confidence equal to a bound belongs to the next lower band.

use crate::config::RoutingConfig;
use crate::error::{Error, Result};
use crate::types::InferenceResult;

/// Label reported when the default handler fires
pub const DEFAULT_LABEL: &str = "default";

/// A band or default handler
pub type Handler<O, R> = Box<dyn Fn(&InferenceResult<O>) -> R + Send + Sync>;

struct Band<O, R> {
    label: String,
    bound: f64,
    handler: Handler<O, R>,
}

/// Which handler fired and what it returned
#[derive(Debug, Clone, PartialEq)]
pub struct RouteOutcome<R> {
    pub label: String,
    pub output: R,
}

/// Ordered confidence bands plus an optional default
pub struct RouteTable<O, R> {
    /// Sorted by bound, highest first
    bands: Vec<Band<O, R>>,
    default: Option<Handler<O, R>>,
}

impl<O, R> RouteTable<O, R> {
    pub fn builder() -> RouteTableBuilder<O, R> {
        RouteTableBuilder {
            bands: Vec::new(),
            default: None,
        }
    }

    /// Bind configured bands to handlers by label.
    ///
    /// Every configured label, including the default's, needs a handler.
    pub fn from_config<F>(config: &RoutingConfig, mut handler_for: F) -> Result<Self>
    where
        F: FnMut(&str) -> Option<Handler<O, R>>,
    {
        let mut builder = Self::builder();
        for band in &config.bands {
            let handler = handler_for(&band.label)
                .ok_or_else(|| Error::Config(format!("no handler for band '{}'", band.label)))?;
            builder = builder.band_boxed(band.label.clone(), band.above, handler);
        }
        if let Some(label) = &config.default {
            let handler = handler_for(label)
                .ok_or_else(|| Error::Config(format!("no handler for default route '{}'", label)))?;
            builder = builder.default_boxed(handler);
        }
        builder.build()
    }

    /// Highest band whose bound `confidence` strictly exceeds
    fn find_band(&self, confidence: f64) -> Option<&Band<O, R>> {
        self.bands.iter().find(|b| confidence > b.bound)
    }

    /// Label of the handler that would fire for `confidence`
    pub fn select(&self, confidence: f64) -> Option<&str> {
        match self.find_band(confidence) {
            Some(band) => Some(band.label.as_str()),
            None if self.default.is_some() => Some(DEFAULT_LABEL),
            None => None,
        }
    }

    /// Invoke exactly one handler for `result`
    pub fn route(&self, result: &InferenceResult<O>) -> Result<RouteOutcome<R>> {
        if let Some(band) = self.find_band(result.confidence) {
            return Ok(RouteOutcome {
                label: band.label.clone(),
                output: (band.handler)(result),
            });
        }
        match &self.default {
            Some(handler) => Ok(RouteOutcome {
                label: DEFAULT_LABEL.to_string(),
                output: handler(result),
            }),
            None => Err(Error::NoDefaultHandler {
                confidence: result.confidence,
            }),
        }
    }

    /// Fail when some confidence could find no handler
    pub fn validate(&self) -> Result<()> {
        if self.default.is_none() {
            return Err(Error::MissingDefaultHandler);
        }
        Ok(())
    }

    /// `(label, bound)` pairs in evaluation order
    pub fn bands(&self) -> Vec<(&str, f64)> {
        self.bands.iter().map(|b| (b.label.as_str(), b.bound)).collect()
    }
}

/// Route a result through a table
pub fn route<O, R>(result: &InferenceResult<O>, table: &RouteTable<O, R>) -> Result<RouteOutcome<R>> {
    table.route(result)
}

/// Builder for [`RouteTable`]
pub struct RouteTableBuilder<O, R> {
    bands: Vec<Band<O, R>>,
    default: Option<Handler<O, R>>,
}

impl<O, R> RouteTableBuilder<O, R> {
    /// Add a band firing for confidences strictly above `above`
    pub fn band<F>(self, label: impl Into<String>, above: f64, handler: F) -> Self
    where
        F: Fn(&InferenceResult<O>) -> R + Send + Sync + 'static,
    {
        self.band_boxed(label, above, Box::new(handler))
    }

    pub fn band_boxed(mut self, label: impl Into<String>, above: f64, handler: Handler<O, R>) -> Self {
        self.bands.push(Band {
            label: label.into(),
            bound: above,
            handler,
        });
        self
    }

    pub fn default<F>(self, handler: F) -> Self
    where
        F: Fn(&InferenceResult<O>) -> R + Send + Sync + 'static,
    {
        self.default_boxed(Box::new(handler))
    }

    pub fn default_boxed(mut self, handler: Handler<O, R>) -> Self {
        self.default = Some(handler);
        self
    }

    /// Sort bands highest first. Bands sharing a bound keep insertion order.
    pub fn build(mut self) -> Result<RouteTable<O, R>> {
        if let Some(bad) = self.bands.iter().find(|b| b.bound.is_nan()) {
            return Err(Error::InvalidRouteBound {
                label: bad.label.clone(),
                bound: bad.bound,
            });
        }
        self.bands
            .sort_by(|a, b| b.bound.partial_cmp(&a.bound).unwrap_or(std::cmp::Ordering::Equal));
        Ok(RouteTable {
            bands: self.bands,
            default: self.default,
        })
    }

    /// Like `build`, but a missing default is an error right away
    pub fn build_strict(self) -> Result<RouteTable<O, R>> {
        let table = self.build()?;
        table.validate()?;
        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BandConfig;

    fn standard() -> RouteTable<&'static str, &'static str> {
        RouteTable::builder()
            .band("medium", 0.5, |_| "medium")
            .band("auto", 0.9, |_| "auto")
            .band("high", 0.7, |_| "high")
            .default(|_| "review")
            .build()
            .unwrap()
    }

    fn label_handler(label: &str) -> Handler<&'static str, String> {
        let label = label.to_string();
        Box::new(move |_: &InferenceResult<&'static str>| label.clone())
    }

    fn at(confidence: f64) -> InferenceResult<&'static str> {
        InferenceResult::new("x", confidence)
    }

    #[test]
    fn test_bands_sorted_descending() {
        assert_eq!(standard().bands(), vec![("auto", 0.9), ("high", 0.7), ("medium", 0.5)]);
    }

    #[test]
    fn test_bound_is_exclusive() {
        let table = standard();
        assert_eq!(table.route(&at(0.95)).unwrap().label, "auto");
        assert_eq!(table.route(&at(0.9)).unwrap().label, "high");
        assert_eq!(table.route(&at(0.7)).unwrap().label, "medium");
        assert_eq!(table.route(&at(0.5)).unwrap().label, "default");
        assert_eq!(table.route(&at(0.0)).unwrap().output, "review");
    }

    #[test]
    fn test_missing_default_is_an_error() {
        let table: RouteTable<&str, &str> = RouteTable::builder().band("auto", 0.9, |_| "auto").build().unwrap();
        assert!(table.validate().is_err());
        assert_eq!(table.select(0.3), None);
        assert!(matches!(table.route(&at(0.3)), Err(Error::NoDefaultHandler { .. })));
        assert_eq!(table.route(&at(0.91)).unwrap().output, "auto");

        let strict: Result<RouteTable<&str, &str>> =
            RouteTable::builder().band("auto", 0.9, |_| "auto").build_strict();
        assert!(matches!(strict, Err(Error::MissingDefaultHandler)));
    }

    #[test]
    fn test_default_only_table() {
        let table: RouteTable<&str, u32> = RouteTable::builder().default(|_| 7).build_strict().unwrap();
        for c in [0.0, 0.5, 1.0] {
            let outcome = table.route(&at(c)).unwrap();
            assert_eq!(outcome.label, DEFAULT_LABEL);
            assert_eq!(outcome.output, 7);
        }
    }

    #[test]
    fn test_select_names_the_handler_route_invokes() {
        let without_default: RouteTable<&str, &str> = RouteTable::builder()
            .band("auto", 0.9, |_| "auto")
            .band("high", 0.7, |_| "high")
            .build()
            .unwrap();
        for c in [0.0, 0.5, 0.7, 0.70001, 0.9, 0.95, 1.0] {
            let routed = standard().route(&at(c)).unwrap().label;
            assert_eq!(standard().select(c), Some(routed.as_str()));
            let routed = without_default.route(&at(c)).ok().map(|o| o.label);
            assert_eq!(without_default.select(c), routed.as_deref());
        }
    }

    #[test]
    fn test_nan_bound_rejected() {
        let built: Result<RouteTable<&str, ()>> = RouteTable::builder().band("broken", f64::NAN, |_| ()).build();
        assert!(matches!(built, Err(Error::InvalidRouteBound { .. })));
    }

    #[test]
    fn test_handler_sees_result() {
        let table: RouteTable<&str, String> = RouteTable::builder()
            .default(|r| format!("{}@{}", r.result, r.confidence))
            .build()
            .unwrap();
        assert_eq!(table.route(&at(0.25)).unwrap().output, "x@0.25");
    }

    #[test]
    fn test_from_config_binds_labels() {
        let config = RoutingConfig {
            bands: vec![
                BandConfig { label: "auto".into(), above: 0.9 },
                BandConfig { label: "review".into(), above: 0.5 },
            ],
            default: Some("reject".into()),
        };
        let table = RouteTable::from_config(&config, |label| Some(label_handler(label))).unwrap();
        assert_eq!(table.route(&at(0.6)).unwrap().output, "review");
        assert_eq!(table.route(&at(0.1)).unwrap().output, "reject");

        let missing: Result<RouteTable<&str, String>> = RouteTable::from_config(&config, |_| None);
        assert!(matches!(missing, Err(Error::Config(_))));
    }
}
