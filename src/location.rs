use crate::model::{Coordinate, KAABA};
use crate::storage::{
    KeyValueStore, KEY_IS_MANUAL_LOCATION, KEY_MANUAL_LATITUDE, KEY_MANUAL_LONGITUDE,
};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;

pub const DEFAULT_LOCATION_LABEL: &str = "Mecca (Default)";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LocationError {
    #[error("location permission denied")]
    PermissionDenied,
    #[error("position unavailable: {0}")]
    PositionUnavailable(String),
}

/// Source de position de l'appareil.
#[async_trait]
pub trait LocationSource: Send + Sync {
    async fn current_coordinate(&self) -> Result<Coordinate, LocationError>;
}

/// Source fixe ; `None` simule une absence de fix.
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticLocationSource {
    position: Option<Coordinate>,
}

impl StaticLocationSource {
    pub fn new(position: Option<Coordinate>) -> Self {
        Self { position }
    }
}

#[async_trait]
impl LocationSource for StaticLocationSource {
    async fn current_coordinate(&self) -> Result<Coordinate, LocationError> {
        self.position
            .ok_or_else(|| LocationError::PositionUnavailable("no position fix".to_string()))
    }
}

/// Origine de la position courante.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocationOrigin {
    Manual,
    Detected,
    /// Repli sur la Kaaba ; porte l'erreur qui l'a provoqué.
    Fallback(FallbackReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackReason {
    PermissionDenied,
    PositionUnavailable,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedLocation {
    pub coordinate: Coordinate,
    pub origin: LocationOrigin,
}

impl ResolvedLocation {
    pub fn label(&self) -> String {
        match self.origin {
            LocationOrigin::Fallback(_) => DEFAULT_LOCATION_LABEL.to_string(),
            _ => crate::geo::format_coordinates(self.coordinate),
        }
    }
}

/// Position de session : surcharge manuelle persistée, sinon détection,
/// sinon la Kaaba.
pub struct LocationStore {
    store: Arc<dyn KeyValueStore>,
    source: Arc<dyn LocationSource>,
    current: RwLock<Option<ResolvedLocation>>,
}

impl LocationStore {
    pub fn new(store: Arc<dyn KeyValueStore>, source: Arc<dyn LocationSource>) -> Self {
        Self {
            store,
            source,
            current: RwLock::new(None),
        }
    }

    pub async fn current(&self) -> Option<ResolvedLocation> {
        *self.current.read().await
    }

    /// Chargement au démarrage.
    pub async fn load(&self) -> anyhow::Result<ResolvedLocation> {
        if let Some(manual) = self.saved_manual().await? {
            let resolved = ResolvedLocation {
                coordinate: manual,
                origin: LocationOrigin::Manual,
            };
            *self.current.write().await = Some(resolved);
            return Ok(resolved);
        }
        self.detect().await
    }

    async fn saved_manual(&self) -> anyhow::Result<Option<Coordinate>> {
        if self.store.get(KEY_IS_MANUAL_LOCATION).await?.as_deref() != Some("true") {
            return Ok(None);
        }
        let lat = self.store.get(KEY_MANUAL_LATITUDE).await?;
        let lon = self.store.get(KEY_MANUAL_LONGITUDE).await?;
        let (Some(lat), Some(lon)) = (lat, lon) else {
            return Ok(None);
        };
        match (lat.parse::<f64>(), lon.parse::<f64>()) {
            (Ok(lat), Ok(lon)) => match Coordinate::new(lat, lon) {
                Ok(c) => Ok(Some(c)),
                Err(err) => {
                    tracing::warn!(error = %err, "ignoring invalid manual location");
                    Ok(None)
                }
            },
            _ => {
                tracing::warn!(%lat, %lon, "ignoring unparsable manual location");
                Ok(None)
            }
        }
    }

    /// Surcharge manuelle, persistée.
    pub async fn set_manual(&self, coordinate: Coordinate) -> anyhow::Result<ResolvedLocation> {
        self.store.set(KEY_IS_MANUAL_LOCATION, "true").await?;
        self.store
            .set(KEY_MANUAL_LATITUDE, &coordinate.latitude().to_string())
            .await?;
        self.store
            .set(KEY_MANUAL_LONGITUDE, &coordinate.longitude().to_string())
            .await?;
        let resolved = ResolvedLocation {
            coordinate,
            origin: LocationOrigin::Manual,
        };
        *self.current.write().await = Some(resolved);
        Ok(resolved)
    }

    /// Détection via la source ; efface la surcharge si le fix réussit.
    /// Les échecs ne remontent pas : repli sur la Kaaba.
    pub async fn detect(&self) -> anyhow::Result<ResolvedLocation> {
        let resolved = match self.source.current_coordinate().await {
            Ok(coordinate) => {
                self.store.set(KEY_IS_MANUAL_LOCATION, "false").await?;
                self.store.remove(KEY_MANUAL_LATITUDE).await?;
                self.store.remove(KEY_MANUAL_LONGITUDE).await?;
                ResolvedLocation {
                    coordinate,
                    origin: LocationOrigin::Detected,
                }
            }
            Err(err) => {
                tracing::warn!(error = %err, "location detection failed, using default");
                let reason = match err {
                    LocationError::PermissionDenied => FallbackReason::PermissionDenied,
                    LocationError::PositionUnavailable(_) => FallbackReason::PositionUnavailable,
                };
                ResolvedLocation {
                    coordinate: KAABA,
                    origin: LocationOrigin::Fallback(reason),
                }
            }
        };
        *self.current.write().await = Some(resolved);
        Ok(resolved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryKvStore;

    struct Denied;

    #[async_trait]
    impl LocationSource for Denied {
        async fn current_coordinate(&self) -> Result<Coordinate, LocationError> {
            Err(LocationError::PermissionDenied)
        }
    }

    #[tokio::test]
    async fn denied_falls_back_to_kaaba() {
        let loc = LocationStore::new(Arc::new(MemoryKvStore::new()), Arc::new(Denied));
        let resolved = loc.load().await.unwrap();
        assert_eq!(resolved.coordinate, KAABA);
        assert_eq!(
            resolved.origin,
            LocationOrigin::Fallback(FallbackReason::PermissionDenied)
        );
        assert_eq!(resolved.label(), DEFAULT_LOCATION_LABEL);
    }

    #[tokio::test]
    async fn manual_override_survives_reload_and_detect_clears_it() {
        let kv: Arc<dyn KeyValueStore> = Arc::new(MemoryKvStore::new());
        let london = Coordinate::new(51.5074, -0.1278).unwrap();
        let paris = Coordinate::new(48.8566, 2.3522).unwrap();
        let source = Arc::new(StaticLocationSource::new(Some(paris)));

        let loc = LocationStore::new(kv.clone(), source.clone());
        loc.set_manual(london).await.unwrap();

        let reloaded = LocationStore::new(kv.clone(), source);
        let resolved = reloaded.load().await.unwrap();
        assert_eq!(resolved.coordinate, london);
        assert_eq!(resolved.origin, LocationOrigin::Manual);

        let detected = reloaded.detect().await.unwrap();
        assert_eq!(detected.coordinate, paris);
        assert_eq!(kv.get(KEY_MANUAL_LATITUDE).await.unwrap(), None);
        assert_eq!(kv.get(KEY_IS_MANUAL_LOCATION).await.unwrap().as_deref(), Some("false"));
    }
}
