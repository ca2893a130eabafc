use anyhow::{Result, anyhow};
use async_trait::async_trait;
use std::fmt::Debug;

use crate::Location;

/// Something that can tell where the user is.
#[async_trait]
pub trait Geolocator: Send + Sync + Debug {
    async fn locate(&self) -> Result<Location>;
}

/// Always answers with the same position.
#[derive(Debug, Clone, Copy)]
pub struct FixedGeolocator(pub Location);

#[async_trait]
impl Geolocator for FixedGeolocator {
    async fn locate(&self) -> Result<Location> {
        Ok(self.0)
    }
}

/// Never answers, like a device where location access was denied.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unavailable;

#[async_trait]
impl Geolocator for Unavailable {
    async fn locate(&self) -> Result<Location> {
        Err(anyhow!("Device location is not available"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fixed_geolocator_returns_its_location() {
        let amsterdam = Location::new(52.37, 4.89).unwrap();
        assert_eq!(FixedGeolocator(amsterdam).locate().await.unwrap(), amsterdam);
    }

    #[tokio::test]
    async fn unavailable_geolocator_fails() {
        assert!(Unavailable.locate().await.is_err());
    }
}
