//! Print service
//!
//! Turns the four control commands into printer jobs and keeps the shared
//! print statistics.

use std::sync::Arc;
use std::time::Duration;

use chrono::Local;
use kassa_printer::{DrawerPin, PrintError};
use parking_lot::Mutex;
use thiserror::Error;
use tokio::time::sleep;
use tracing::{error, info, instrument, warn};

use super::link::PrinterLink;
use super::storage::PrinterSettings;
use super::types::{PrintStats, PrinterEndpoint};
use crate::orders::{BusinessInfo, Order};
use crate::receipt::{ReceiptLayout, ReceiptRenderer, drawer_pulse};

/// Pause between the customer copy and the second copy
pub const COPY_DELAY: Duration = Duration::from_millis(500);

#[derive(Debug, Error)]
pub enum PrintServiceError {
    #[error("Printer not configured")]
    NotConfigured,

    /// Copy 1 failing means copy 2 was never sent
    #[error("Copy {copy} failed: {source}")]
    Delivery {
        copy: u8,
        #[source]
        source: PrintError,
    },
}

pub type PrintServiceResult<T> = Result<T, PrintServiceError>;

/// Print service shared by the control server and the in-process bridge
pub struct PrintService {
    link: Arc<dyn PrinterLink>,
    settings: Arc<PrinterSettings>,
    renderer: ReceiptRenderer,
    stats: Mutex<PrintStats>,
    copy_delay: Duration,
    drawer_pin: DrawerPin,
}

impl PrintService {
    pub fn new(link: Arc<dyn PrinterLink>, settings: Arc<PrinterSettings>) -> Self {
        Self {
            link,
            settings,
            renderer: ReceiptRenderer::default(),
            stats: Mutex::new(PrintStats::default()),
            copy_delay: COPY_DELAY,
            drawer_pin: DrawerPin::default(),
        }
    }

    pub fn with_layout(mut self, layout: ReceiptLayout) -> Self {
        self.renderer = ReceiptRenderer::new(layout);
        self
    }

    pub fn with_copy_delay(mut self, delay: Duration) -> Self {
        self.copy_delay = delay;
        self
    }

    pub fn with_drawer_pin(mut self, pin: DrawerPin) -> Self {
        self.drawer_pin = pin;
        self
    }

    pub fn settings(&self) -> &Arc<PrinterSettings> {
        &self.settings
    }

    /// Snapshot of the counters
    pub fn stats(&self) -> PrintStats {
        self.stats.lock().clone()
    }

    /// Print the customer receipt twice
    ///
    /// The bytes are rendered once. A failed first copy ends the operation
    /// without attempting the second.
    #[instrument(skip_all, fields(order_number = order.order_number))]
    pub async fn print_receipt(
        &self,
        order: &Order,
        business: &BusinessInfo,
    ) -> PrintServiceResult<()> {
        let endpoint = self.endpoint()?;
        let data = self
            .renderer
            .render(order, business, Local::now().naive_local());

        self.deliver_copy(&endpoint, &data, 1).await?;
        sleep(self.copy_delay).await;
        self.deliver_copy(&endpoint, &data, 2).await?;

        self.record_success();
        info!(printer = %endpoint, bytes = data.len(), "Receipt printed");
        Ok(())
    }

    /// Kick the cash drawer
    #[instrument(skip_all)]
    pub async fn open_drawer(&self) -> PrintServiceResult<()> {
        let endpoint = self.endpoint()?;
        let data = drawer_pulse(self.drawer_pin);

        self.link
            .deliver(&endpoint, &data)
            .await
            .map_err(|source| self.record_failure(PrintServiceError::Delivery { copy: 1, source }))?;

        info!(printer = %endpoint, "Cash drawer opened");
        Ok(())
    }

    /// Print the connectivity test page
    #[instrument(skip_all)]
    pub async fn test_print(&self) -> PrintServiceResult<()> {
        let endpoint = self.endpoint()?;
        let data = self
            .renderer
            .render_test_page(&endpoint.to_string(), Local::now().naive_local());

        self.deliver_copy(&endpoint, &data, 1).await?;

        self.record_success();
        info!(printer = %endpoint, "Test page printed");
        Ok(())
    }

    fn endpoint(&self) -> PrintServiceResult<PrinterEndpoint> {
        match self.settings.current() {
            Some(endpoint) => Ok(endpoint),
            None => {
                warn!("No printer configured");
                Err(self.record_failure(PrintServiceError::NotConfigured))
            }
        }
    }

    async fn deliver_copy(
        &self,
        endpoint: &PrinterEndpoint,
        data: &[u8],
        copy: u8,
    ) -> PrintServiceResult<()> {
        self.link
            .deliver(endpoint, data)
            .await
            .map_err(|source| self.record_failure(PrintServiceError::Delivery { copy, source }))
    }

    fn record_success(&self) {
        let mut stats = self.stats.lock();
        stats.print_count += 1;
        stats.last_print_time = Some(Local::now());
        stats.last_error = None;
    }

    fn record_failure(&self, err: PrintServiceError) -> PrintServiceError {
        error!(error = %err, "Print operation failed");
        self.stats.lock().last_error = Some(err.to_string());
        err
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use kassa_printer::{PrintResult, commands};
    use std::net::Ipv4Addr;
    use tokio::time::Instant;

    /// Records every delivery; fails the calls whose index is listed
    #[derive(Default)]
    struct RecordingLink {
        sent: Mutex<Vec<(Instant, Vec<u8>)>>,
        fail_on: Vec<usize>,
    }

    impl RecordingLink {
        fn failing_on(fail_on: Vec<usize>) -> Self {
            Self {
                sent: Mutex::new(Vec::new()),
                fail_on,
            }
        }

        fn sent(&self) -> Vec<(Instant, Vec<u8>)> {
            self.sent.lock().clone()
        }
    }

    #[async_trait]
    impl PrinterLink for RecordingLink {
        async fn deliver(&self, _endpoint: &PrinterEndpoint, data: &[u8]) -> PrintResult<()> {
            let index = {
                let mut sent = self.sent.lock();
                sent.push((Instant::now(), data.to_vec()));
                sent.len() - 1
            };
            if self.fail_on.contains(&index) {
                return Err(PrintError::Connection("refused".into()));
            }
            Ok(())
        }
    }

    fn configured() -> Arc<PrinterSettings> {
        Arc::new(
            PrinterSettings::in_memory(Some(PrinterEndpoint::new(
                Ipv4Addr::new(192, 168, 1, 50),
                9100,
            )))
            .unwrap(),
        )
    }

    fn order() -> Order {
        serde_json::from_str(
            r#"{"orderNumber": 12, "items": [{"name": "Friet", "quantity": 2, "totalPrice": 6.0}],
                "subtotal": 6.0, "tax": 0.5, "total": 6.5, "paymentMethod": "CASH"}"#,
        )
        .unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_receipt_is_sent_twice_with_delay() {
        let link = Arc::new(RecordingLink::default());
        let service = PrintService::new(link.clone(), configured());

        service
            .print_receipt(&order(), &BusinessInfo::default())
            .await
            .unwrap();

        let sent = link.sent();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].1, sent[1].1);
        assert!(sent[1].0 - sent[0].0 >= COPY_DELAY);

        let stats = service.stats();
        assert_eq!(stats.print_count, 1);
        assert!(stats.last_print_time.is_some());
        assert!(stats.last_error.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_copy_failure_skips_second() {
        let link = Arc::new(RecordingLink::failing_on(vec![0]));
        let service = PrintService::new(link.clone(), configured());

        let result = service.print_receipt(&order(), &BusinessInfo::default()).await;
        assert!(matches!(
            result,
            Err(PrintServiceError::Delivery { copy: 1, .. })
        ));
        assert_eq!(link.sent().len(), 1);

        let stats = service.stats();
        assert_eq!(stats.print_count, 0);
        assert!(stats.last_error.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_copy_failure_fails_operation() {
        let link = Arc::new(RecordingLink::failing_on(vec![1]));
        let service = PrintService::new(link.clone(), configured());

        let result = service.print_receipt(&order(), &BusinessInfo::default()).await;
        assert!(matches!(
            result,
            Err(PrintServiceError::Delivery { copy: 2, .. })
        ));
        assert_eq!(link.sent().len(), 2);
        assert_eq!(service.stats().print_count, 0);
    }

    #[tokio::test]
    async fn test_not_configured_skips_io() {
        let link = Arc::new(RecordingLink::default());
        let settings = Arc::new(PrinterSettings::in_memory(None).unwrap());
        let service = PrintService::new(link.clone(), settings);

        assert!(matches!(
            service.print_receipt(&order(), &BusinessInfo::default()).await,
            Err(PrintServiceError::NotConfigured)
        ));
        assert!(matches!(
            service.open_drawer().await,
            Err(PrintServiceError::NotConfigured)
        ));
        assert!(matches!(
            service.test_print().await,
            Err(PrintServiceError::NotConfigured)
        ));
        assert!(link.sent().is_empty());
        assert_eq!(
            service.stats().last_error.as_deref(),
            Some("Printer not configured")
        );
    }

    #[tokio::test]
    async fn test_drawer_uses_configured_pin() {
        let link = Arc::new(RecordingLink::default());
        let service = PrintService::new(link.clone(), configured()).with_drawer_pin(DrawerPin::Pin5);

        service.open_drawer().await.unwrap();

        let sent = link.sent();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].1.ends_with(commands::DRAWER_PIN5));
        // Drawer pulses are not prints
        assert_eq!(service.stats().print_count, 0);
    }

    #[tokio::test]
    async fn test_test_print_counts_once() {
        let link = Arc::new(RecordingLink::default());
        let service = PrintService::new(link.clone(), configured());

        service.test_print().await.unwrap();

        let sent = link.sent();
        assert_eq!(sent.len(), 1);
        let page = &sent[0].1;
        assert!(page.windows(26).any(|w| w == b"Printer: 192.168.1.50:9100"));
        assert_eq!(service.stats().print_count, 1);
    }
}
