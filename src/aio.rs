//! Asynchronous sessions.
//!
//! Transactions block on the device's response, so each call runs on tokio's
//! blocking thread pool.

use std::{path::Path, sync::Arc, time::Duration};

use crate::{
    channel::Transport, Config, Error, Hidraw, Model, OpenError, Rail, RailSample, SensorKind,
};

/// Session with asynchronous methods.
///
/// This is extremely overkill for the amount of IO the power supply requires,
/// and the async runtime may actually slow things down depending on your
/// application.
#[derive(Debug)]
pub struct Session<T> {
    inner: Arc<crate::Session<T>>,
}

impl<T> Clone for Session<T> {
    fn clone(&self) -> Self {
        Session {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> From<crate::Session<T>> for Session<T> {
    fn from(session: crate::Session<T>) -> Self {
        Session {
            inner: Arc::new(session),
        }
    }
}

/// Power supply with asynchronous methods.
pub type PowerSupply = Session<Hidraw>;

impl Session<Hidraw> {
    /// Open the power supply by file path.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use corsairlink::aio::PowerSupply;
    ///
    /// # async fn dox() -> Result<(), corsairlink::OpenError> {
    /// let psu: PowerSupply = PowerSupply::open("/dev/hidraw5").await?;
    /// // call psu methods here
    /// # Ok(())
    /// # }
    /// ```
    pub async fn open<P: AsRef<Path>>(path: P) -> Result<PowerSupply, OpenError> {
        Self::open_with(path, Config::default()).await
    }

    /// Open the power supply by file path with a custom configuration.
    pub async fn open_with<P: AsRef<Path>>(
        path: P,
        config: Config,
    ) -> Result<PowerSupply, OpenError> {
        let path = path.as_ref().to_owned();
        let psu = tokio::task::spawn_blocking(move || crate::PowerSupply::open_with(path, config))
            .await
            .map_err(|e| OpenError::Session(Error::Task(e)))??;
        Ok(psu.into())
    }

    /// Get the power supply model.
    pub fn model(&self) -> Model {
        self.inner.model()
    }
}

impl<T: Transport + 'static> Session<T> {
    async fn blocking<R, F>(&self, f: F) -> Result<R, Error>
    where
        F: FnOnce(&crate::Session<T>) -> Result<R, Error> + Send + 'static,
        R: Send + 'static,
    {
        let inner = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || f(&inner)).await?
    }

    /// Device name fetched when the session started.
    pub fn identity(&self) -> &str {
        self.inner.identity()
    }

    /// Read one sensor channel.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use corsairlink::{aio::PowerSupply, SensorKind};
    ///
    /// # async fn dox() -> Result<(), Box<dyn std::error::Error>> {
    /// let psu = PowerSupply::open("/dev/hidraw5").await?;
    /// println!("+12V current: {} mA", psu.read(SensorKind::Current, 0).await?);
    /// # Ok(())
    /// # }
    /// ```
    pub async fn read(&self, kind: SensorKind, channel: u8) -> Result<i64, Error> {
        self.blocking(move |s| s.read(kind, channel)).await
    }

    /// Temperature probe reading, raw device units.
    pub async fn temperature(&self, probe: u8) -> Result<i64, Error> {
        self.blocking(move |s| s.temperature(probe)).await
    }

    /// Fan rotations per minute.
    pub async fn fan_rpm(&self) -> Result<i64, Error> {
        self.blocking(|s| s.fan_rpm()).await
    }

    /// Input voltage in millivolts.
    pub async fn input_voltage(&self) -> Result<i64, Error> {
        self.blocking(|s| s.input_voltage()).await
    }

    /// Input power in microwatts.
    pub async fn input_power(&self) -> Result<i64, Error> {
        self.blocking(|s| s.input_power()).await
    }

    /// Get the current, voltage, and power for an output rail.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use corsairlink::{aio::PowerSupply, RAILS};
    ///
    /// # async fn dox() -> Result<(), Box<dyn std::error::Error>> {
    /// let psu = PowerSupply::open("/dev/hidraw5").await?;
    /// for rail in RAILS.iter() {
    ///     println!("{}: {:?}", rail, psu.rail(*rail).await?);
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub async fn rail(&self, rail: Rail) -> Result<RailSample, Error> {
        self.blocking(move |s| s.rail(rail)).await
    }

    /// Vendor name.
    pub async fn vendor(&self) -> Result<String, Error> {
        self.blocking(|s| s.vendor()).await
    }

    /// Product name.
    pub async fn product(&self) -> Result<String, Error> {
        self.blocking(|s| s.product()).await
    }

    /// Power supply uptime.
    pub async fn uptime(&self) -> Result<Duration, Error> {
        self.blocking(|s| s.uptime()).await
    }

    /// PC uptime.
    pub async fn pc_uptime(&self) -> Result<Duration, Error> {
        self.blocking(|s| s.pc_uptime()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{cmd, mock};

    #[tokio::test]
    async fn concurrent_reads() {
        let session: Session<mock::Mock> = mock::session(|f| match f[0] {
            cmd::WRITE => mock::Reply::Now(vec![0x00]),
            _ => mock::Reply::After(
                Duration::from_millis(1),
                vec![0x00, f[1], 0x04, 0x08],
            ),
        })
        .into();
        assert_eq!(session.identity(), mock::NAME);

        let a = session.clone();
        let b = session.clone();
        let (x, y) = tokio::join!(
            a.read(SensorKind::Current, 0),
            b.read(SensorKind::Current, 2)
        );
        assert_eq!(x.unwrap(), 8_000);
        assert_eq!(y.unwrap(), 8_000);
        assert_eq!(session.inner.transport().sent().len(), 4);
    }

    #[tokio::test]
    async fn errors_cross_the_pool() {
        let session: Session<mock::Mock> = mock::session(|_| mock::Reply::Now(vec![0x01])).into();
        assert!(matches!(session.fan_rpm().await, Err(Error::Unsupported)));
    }
}
