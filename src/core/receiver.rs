use crate::core::params::ReceiverSpec;
use crate::domain::model::Receiver;
use crate::domain::ports::StationLookup;
use crate::utils::error::{Result, SeismoError};

pub struct ReceiverResolver<'a> {
    stations: Option<&'a dyn StationLookup>,
    max_receivers: usize,
}

impl<'a> ReceiverResolver<'a> {
    pub fn new(stations: Option<&'a dyn StationLookup>, max_receivers: usize) -> Self {
        Self {
            stations,
            max_receivers,
        }
    }

    /// Non-empty, ordered receiver list for the request.
    pub async fn resolve(&self, spec: &ReceiverSpec) -> Result<Vec<Receiver>> {
        match spec {
            ReceiverSpec::Coordinates {
                latitude,
                longitude,
                depth_in_m,
                network,
                station,
                location,
            } => {
                let receiver =
                    Receiver::new(*latitude, *longitude, *depth_in_m, network, station, location)
                        .map_err(|e| match e {
                            SeismoError::InvalidValue { field, reason } => {
                                SeismoError::InvalidValue {
                                    field,
                                    reason: format!(
                                        "Could not construct receiver with passed parameters. {}",
                                        reason
                                    ),
                                }
                            }
                            other => other,
                        })?;
                Ok(vec![receiver])
            }
            ReceiverSpec::Query { networks, stations } => {
                let lookup = self.stations.ok_or_else(|| {
                    SeismoError::unsupported(
                        "Server does not support station coordinates and thus no station queries.",
                    )
                })?;

                let records = lookup.stations(networks, stations).await?;
                if records.is_empty() {
                    return Err(SeismoError::not_found(
                        "No coordinates found satisfying the query.",
                    ));
                }
                if records.len() > self.max_receivers {
                    return Err(SeismoError::invalid(
                        "station",
                        format!(
                            "The query resolved to {} receivers but at most {} are allowed \
                             per request.",
                            records.len(),
                            self.max_receivers
                        ),
                    ));
                }
                tracing::debug!("Station query resolved to {} receivers", records.len());

                records
                    .iter()
                    .map(|r| {
                        Receiver::new(r.latitude, r.longitude, 0.0, &r.network, &r.station, "")
                            .map_err(|e| {
                                SeismoError::invalid(
                                    "station",
                                    format!(
                                        "Could not construct receiver {}.{} with the returned \
                                         coordinates: {}",
                                        r.network, r.station, e
                                    ),
                                )
                            })
                    })
                    .collect()
            }
        }
    }
}
