//! Customer receipt renderer
//!
//! Renders an [`Order`] plus the business profile into ESC/POS bytes. The
//! clock is passed in, so the same inputs always produce the same bytes.

use chrono::NaiveDateTime;
use kassa_printer::{DrawerPin, EscPosBuilder};
use rust_decimal::Decimal;

use crate::orders::model::non_empty;
use crate::orders::{BusinessInfo, Order, OrderItem};

/// Column width of the darkened 80mm profile
pub const RECEIPT_WIDTH: usize = 42;

/// Paper geometry and print density
///
/// Only one profile is active per process; it comes from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReceiptLayout {
    /// Working width in columns
    pub width: usize,
    /// Emphasize, bold and wide spacing for the whole receipt
    pub darken: bool,
}

impl Default for ReceiptLayout {
    fn default() -> Self {
        Self {
            width: RECEIPT_WIDTH,
            darken: true,
        }
    }
}

/// Receipt renderer
pub struct ReceiptRenderer {
    layout: ReceiptLayout,
}

impl ReceiptRenderer {
    pub fn new(layout: ReceiptLayout) -> Self {
        Self { layout }
    }

    /// Render a customer receipt to ESC/POS bytes
    pub fn render(
        &self,
        order: &Order,
        business: &BusinessInfo,
        printed_at: NaiveDateTime,
    ) -> Vec<u8> {
        let mut b = EscPosBuilder::new(self.layout.width);
        b.code_page_pc858();

        if self.layout.darken {
            b.emphasize();
            b.bold();
            b.line_spacing_wide();
            b.char_spacing_wide();
        }

        self.render_header(&mut b, business);
        self.render_order_info(&mut b, order, printed_at);

        for item in &order.items {
            self.render_item(&mut b, item);
        }

        self.render_totals(&mut b, order);
        self.render_footer(&mut b, business);

        b.build()
    }

    /// Business name, address and phone
    fn render_header(&self, b: &mut EscPosBuilder, business: &BusinessInfo) {
        b.newline();
        b.center();

        b.bold();
        if let Some(name) = non_empty(&business.name) {
            b.double_size();
            b.line(name);
            b.reset_size();
        }
        if let Some(address) = non_empty(&business.address) {
            b.line(address);
        }
        let postal_code = non_empty(&business.postal_code).unwrap_or_default();
        let city = non_empty(&business.city).unwrap_or_default();
        let locality = format!("{} {}", postal_code, city);
        if !locality.trim().is_empty() {
            b.line(locality.trim());
        }
        if let Some(phone) = non_empty(&business.phone) {
            b.line(&format!("Tel: {}", phone));
        }
        b.bold_off();

        b.newline();
        b.sep_single();
    }

    /// Order-type banner, number, timestamp, table and staff
    fn render_order_info(&self, b: &mut EscPosBuilder, order: &Order, printed_at: NaiveDateTime) {
        b.bold();
        b.double_height();
        b.line(order.order_type.label());
        b.reset_size();
        b.bold_off();
        b.newline();

        b.left();
        let timestamp = printed_at.format("%d-%m-%y, %H:%M").to_string();
        b.line_lr(&format!("Bon #{}", order.order_number), &timestamp);

        if let Some(table) = non_empty(&order.table_number) {
            b.line(&format!("Tafel {}", table));
        }

        if let Some(staff) = non_empty(&order.staff_name) {
            b.center();
            b.line(&format!("Bediend door: {}", staff));
        }

        b.newline();
        b.sep_single();
        b.newline();
        b.left();
    }

    fn render_item(&self, b: &mut EscPosBuilder, item: &OrderItem) {
        b.bold();
        b.double_height();
        b.line_lr(
            &format!("{}x {}", item.quantity, item.name),
            &euro(item.total_price),
        );
        b.reset_size();
        b.bold_off();

        if !item.selected_options.is_empty() {
            b.newline();
            for option in &item.selected_options {
                if let Some(name) = non_empty(&option.option_name) {
                    b.line(&format!("   + {}", name));
                }
            }
        }

        b.newline();
    }

    fn render_totals(&self, b: &mut EscPosBuilder, order: &Order) {
        b.sep_single();

        b.bold();
        b.double_height();
        b.line_lr("Subtotaal", &euro(order.subtotal));
        b.line_lr("BTW", &euro(order.tax));
        b.reset_size();
        b.bold_off();
        b.newline();
        b.sep_single();

        b.newline();
        b.bold();
        b.double_height();
        b.line_lr("TOTAAL", &euro(order.total));
        b.reset_size();
        b.bold_off();

        b.newline();
        b.center();
        b.line(&format!("Betaald met: {}", order.payment_method.label()));
        b.newline();
        b.sep_single();
    }

    /// VAT number, thank-you line, website, then feed and cut
    fn render_footer(&self, b: &mut EscPosBuilder, business: &BusinessInfo) {
        if let Some(vat) = non_empty(&business.vat_number) {
            b.newline();
            b.line(&format!("BTW: {}", vat));
        }

        b.newline();
        b.bold();
        b.line("Bedankt voor uw bezoek!");
        b.bold_off();

        if let Some(website) = non_empty(&business.website) {
            b.line(website);
        }

        b.feed(4);
        if self.layout.darken {
            b.emphasize_off();
        }
        b.cut();
    }

    /// Render the connectivity test page
    ///
    /// `printer` is shown verbatim, typically `ip:port`.
    pub fn render_test_page(&self, printer: &str, printed_at: NaiveDateTime) -> Vec<u8> {
        let mut b = EscPosBuilder::new(self.layout.width);
        b.code_page_pc858();
        b.center();

        b.bold();
        b.double_height();
        b.line("TEST PRINT");
        b.reset_size();
        b.bold_off();
        b.sep_single();

        b.line("Kassa Print Bridge");
        b.line(&format!("Printer: {}", printer));
        b.sep_single();

        b.line("Als je dit ziet,");
        b.line("werkt alles!");
        b.sep_single();

        b.line(&printed_at.format("%d-%m-%y %H:%M:%S").to_string());
        b.feed(3);
        b.cut();

        b.build()
    }
}

impl Default for ReceiptRenderer {
    fn default() -> Self {
        Self::new(ReceiptLayout::default())
    }
}

/// Bytes that kick the cash drawer on the given pin
pub fn drawer_pulse(pin: DrawerPin) -> Vec<u8> {
    let mut b = EscPosBuilder::default();
    b.open_drawer(pin);
    b.build()
}

/// `€` followed by the amount with two decimals
fn euro(amount: Decimal) -> String {
    format!("€{:.2}", amount)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orders::{OrderType, PaymentMethod, SelectedOption};
    use chrono::NaiveDate;
    use kassa_printer::{commands, encode_pc858};

    fn fixed_clock() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 9)
            .unwrap()
            .and_hms_opt(18, 5, 42)
            .unwrap()
    }

    fn friet_order() -> Order {
        Order {
            order_number: 12,
            order_type: OrderType::Takeaway,
            items: vec![OrderItem {
                name: "Friet".into(),
                quantity: 2,
                total_price: Decimal::new(600, 2),
                selected_options: vec![],
            }],
            subtotal: Decimal::new(600, 2),
            tax: Decimal::new(50, 2),
            total: Decimal::new(650, 2),
            payment_method: PaymentMethod::Cash,
            staff_name: None,
            table_number: None,
        }
    }

    fn contains(haystack: &[u8], needle: &[u8]) -> bool {
        haystack.windows(needle.len()).any(|w| w == needle)
    }

    fn padded(left: &str, right: &str, width: usize) -> Vec<u8> {
        let spaces = width - left.chars().count() - right.chars().count();
        let mut line = encode_pc858(left);
        line.extend(std::iter::repeat_n(b' ', spaces));
        line.extend(encode_pc858(right));
        line.push(b'\n');
        line
    }

    #[test]
    fn test_friet_receipt() {
        let renderer = ReceiptRenderer::default();
        let data = renderer.render(&friet_order(), &BusinessInfo::default(), fixed_clock());

        assert!(data.starts_with(commands::INITIALIZE));
        assert!(contains(&data, b"AFHALEN\n"));
        assert!(contains(&data, &padded("2x Friet", "€6.00", 42)));
        assert!(contains(&data, &padded("TOTAAL", "€6.50", 42)));
        assert!(contains(&data, &padded("Subtotaal", "€6.00", 42)));
        assert!(contains(&data, &padded("BTW", "€0.50", 42)));
        assert!(contains(&data, b"Betaald met: Contant\n"));
        assert!(contains(&data, &padded("Bon #12", "09-03-24, 18:05", 42)));
        assert!(data.ends_with(commands::CUT_FULL));
    }

    #[test]
    fn test_render_is_deterministic() {
        let renderer = ReceiptRenderer::default();
        let business = BusinessInfo {
            name: Some("Frituur De Hoek".into()),
            city: Some("Utrecht".into()),
            postal_code: Some("3511 AB".into()),
            ..Default::default()
        };
        let a = renderer.render(&friet_order(), &business, fixed_clock());
        let b = renderer.render(&friet_order(), &business, fixed_clock());
        assert_eq!(a, b);
    }

    #[test]
    fn test_darken_preamble() {
        let data = ReceiptRenderer::default().render(
            &friet_order(),
            &BusinessInfo::default(),
            fixed_clock(),
        );
        let mut preamble = Vec::new();
        preamble.extend_from_slice(commands::INITIALIZE);
        preamble.extend_from_slice(commands::CODE_PAGE_PC858);
        preamble.extend_from_slice(commands::EMPHASIZE_ON);
        preamble.extend_from_slice(commands::BOLD_ON);
        preamble.extend_from_slice(commands::LINE_SPACING_WIDE);
        preamble.extend_from_slice(commands::CHAR_SPACING_WIDE);
        assert!(data.starts_with(&preamble));

        let mut tail = Vec::new();
        tail.extend_from_slice(&[0x1B, 0x64, 4]);
        tail.extend_from_slice(commands::EMPHASIZE_OFF);
        tail.extend_from_slice(commands::CUT_FULL);
        assert!(data.ends_with(&tail));
    }

    #[test]
    fn test_plain_layout_has_no_darkening() {
        let renderer = ReceiptRenderer::new(ReceiptLayout {
            width: 32,
            darken: false,
        });
        let data = renderer.render(&friet_order(), &BusinessInfo::default(), fixed_clock());
        assert!(!contains(&data, commands::EMPHASIZE_ON));
        assert!(!contains(&data, commands::CHAR_SPACING_WIDE));
        assert!(contains(&data, &padded("2x Friet", "€6.00", 32)));
    }

    #[test]
    fn test_business_fields_and_optional_lines() {
        let business = BusinessInfo {
            name: Some("Frituur De Hoek".into()),
            address: Some("Oudegracht 1".into()),
            city: Some("Utrecht".into()),
            postal_code: Some("3511 AB".into()),
            phone: Some("030-1234567".into()),
            vat_number: Some("NL123456789B01".into()),
            website: Some("www.dehoek.nl".into()),
        };
        let mut order = friet_order();
        order.order_type = OrderType::DineIn;
        order.staff_name = Some("Anouk".into());
        order.table_number = Some("7".into());
        order.items[0].selected_options = vec![
            SelectedOption {
                option_name: Some("Mayo".into()),
            },
            SelectedOption { option_name: None },
        ];

        let data = ReceiptRenderer::default().render(&order, &business, fixed_clock());
        assert!(contains(&data, b"Frituur De Hoek\n"));
        assert!(contains(&data, b"Oudegracht 1\n"));
        assert!(contains(&data, b"3511 AB Utrecht\n"));
        assert!(contains(&data, b"Tel: 030-1234567\n"));
        assert!(contains(&data, b"HIER OPETEN\n"));
        assert!(contains(&data, b"Tafel 7\n"));
        assert!(contains(&data, b"Bediend door: Anouk\n"));
        assert!(contains(&data, b"\n   + Mayo\n\n"));
        assert!(contains(&data, b"BTW: NL123456789B01\n"));
        assert!(contains(&data, b"Bedankt voor uw bezoek!\n"));
        assert!(contains(&data, b"www.dehoek.nl\n"));
    }

    #[test]
    fn test_absent_business_fields_are_omitted() {
        let business = BusinessInfo {
            name: Some(String::new()),
            ..Default::default()
        };
        let data = ReceiptRenderer::default().render(&friet_order(), &business, fixed_clock());
        assert!(!contains(&data, b"Tel:"));
        assert!(!contains(&data, b"BTW: "));
        assert!(!contains(&data, b"Bediend door"));
        assert!(!contains(&data, b"Tafel"));
        // No double-size block for an empty name
        assert!(!contains(&data, commands::SIZE_DOUBLE));
    }

    #[test]
    fn test_long_item_name_keeps_one_space() {
        let mut order = friet_order();
        order.items[0].name = "Broodje kroket met extra mosterd en uitjes".into();
        let data = ReceiptRenderer::default().render(&order, &BusinessInfo::default(), fixed_clock());
        assert!(contains(
            &data,
            &encode_pc858("2x Broodje kroket met extra mosterd en uitjes €6.00\n")
        ));
    }

    #[test]
    fn test_test_page() {
        let renderer = ReceiptRenderer::default();
        let data = renderer.render_test_page("192.168.1.50:9100", fixed_clock());
        assert!(data.starts_with(commands::INITIALIZE));
        assert!(contains(&data, b"TEST PRINT\n"));
        assert!(contains(&data, b"Printer: 192.168.1.50:9100\n"));
        assert!(contains(&data, b"Als je dit ziet,\n"));
        assert!(contains(&data, b"werkt alles!\n"));
        assert!(contains(&data, b"09-03-24 18:05:42\n"));
        assert!(data.ends_with(commands::CUT_FULL));
    }

    #[test]
    fn test_drawer_pulse() {
        let mut expected = commands::INITIALIZE.to_vec();
        expected.extend_from_slice(commands::DRAWER_PIN2);
        assert_eq!(drawer_pulse(DrawerPin::Pin2), expected);

        let mut expected = commands::INITIALIZE.to_vec();
        expected.extend_from_slice(commands::DRAWER_PIN5);
        assert_eq!(drawer_pulse(DrawerPin::Pin5), expected);
    }
}
