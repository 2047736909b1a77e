//! ESC/POS command builder
//!
//! Provides the opcode table and a fluent API for building ESC/POS print data.

use crate::encoding::{EURO, encode_pc858, price_line};

/// ESC/POS opcode table
///
/// Byte-exact sequences understood by Epson-compatible receipt printers.
pub mod commands {
    /// ESC @ - Initialize printer
    pub const INITIALIZE: &[u8] = &[0x1B, 0x40];
    /// ESC t 19 - Select PC858 (Western European with Euro)
    pub const CODE_PAGE_PC858: &[u8] = &[0x1B, 0x74, 0x13];

    /// ESC a n - Justification
    pub const ALIGN_LEFT: &[u8] = &[0x1B, 0x61, 0x00];
    pub const ALIGN_CENTER: &[u8] = &[0x1B, 0x61, 0x01];
    pub const ALIGN_RIGHT: &[u8] = &[0x1B, 0x61, 0x02];

    /// ESC E n - Emphasized (bold)
    pub const BOLD_ON: &[u8] = &[0x1B, 0x45, 0x01];
    pub const BOLD_OFF: &[u8] = &[0x1B, 0x45, 0x00];

    /// ESC G n - Double-strike
    pub const EMPHASIZE_ON: &[u8] = &[0x1B, 0x47, 0x01];
    pub const EMPHASIZE_OFF: &[u8] = &[0x1B, 0x47, 0x00];

    /// GS ! n - Character size
    pub const SIZE_NORMAL: &[u8] = &[0x1D, 0x21, 0x00];
    pub const SIZE_DOUBLE_HEIGHT: &[u8] = &[0x1D, 0x21, 0x01];
    pub const SIZE_DOUBLE_WIDTH: &[u8] = &[0x1D, 0x21, 0x10];
    pub const SIZE_DOUBLE: &[u8] = &[0x1D, 0x21, 0x11];
    pub const SIZE_LARGE: &[u8] = &[0x1D, 0x21, 0x22];

    /// ESC 2 / ESC 3 n - Line spacing
    pub const LINE_SPACING_NORMAL: &[u8] = &[0x1B, 0x32];
    pub const LINE_SPACING_WIDE: &[u8] = &[0x1B, 0x33, 0x28];

    /// ESC SP n - Right-side character spacing
    pub const CHAR_SPACING_NORMAL: &[u8] = &[0x1B, 0x20, 0x00];
    pub const CHAR_SPACING_WIDE: &[u8] = &[0x1B, 0x20, 0x01];

    /// ESC - n - Underline
    pub const UNDERLINE_ON: &[u8] = &[0x1B, 0x2D, 0x01];
    pub const UNDERLINE_OFF: &[u8] = &[0x1B, 0x2D, 0x00];

    /// LF
    pub const LINE_FEED: &[u8] = &[0x0A];
    /// ESC d - Print and feed n lines (followed by n)
    pub const FEED_LINES: &[u8] = &[0x1B, 0x64];

    /// GS V m - Cut
    pub const CUT_FULL: &[u8] = &[0x1D, 0x56, 0x00];
    pub const CUT_PARTIAL: &[u8] = &[0x1D, 0x56, 0x01];

    /// ESC p m t1 t2 - Drawer kick pulse (25 * 2ms on, 250 * 2ms off)
    pub const DRAWER_PIN2: &[u8] = &[0x1B, 0x70, 0x00, 0x19, 0xFA];
    pub const DRAWER_PIN5: &[u8] = &[0x1B, 0x70, 0x01, 0x19, 0xFA];

    /// ESC B n t - Buzzer
    pub const BEEP: &[u8] = &[0x1B, 0x42, 0x03, 0x02];
}

/// Cash drawer connector pin
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DrawerPin {
    #[default]
    Pin2,
    Pin5,
}

impl DrawerPin {
    /// Parse the connector number (2 or 5)
    pub fn from_number(n: u8) -> Option<Self> {
        match n {
            2 => Some(Self::Pin2),
            5 => Some(Self::Pin5),
            _ => None,
        }
    }

    fn command(self) -> &'static [u8] {
        match self {
            Self::Pin2 => commands::DRAWER_PIN2,
            Self::Pin5 => commands::DRAWER_PIN5,
        }
    }
}

/// ESC/POS command builder
///
/// Builds ESC/POS byte sequences for thermal printers.
/// Text is encoded to PC858 as it is written, so command bytes are never
/// touched by the text conversion.
pub struct EscPosBuilder {
    buf: Vec<u8>,
    width: usize,
}

impl EscPosBuilder {
    /// Create a new builder with the specified paper width in characters
    ///
    /// Common widths:
    /// - 58mm paper: 32 characters
    /// - 80mm paper: 42 characters at wide character spacing, 48 otherwise
    pub fn new(width: usize) -> Self {
        let mut buf = Vec::with_capacity(4096);
        buf.extend_from_slice(commands::INITIALIZE);
        Self { buf, width }
    }

    /// Get the configured paper width
    pub fn width(&self) -> usize {
        self.width
    }

    // === Text Output ===

    /// Write text (PC858 encoded)
    pub fn text(&mut self, s: &str) -> &mut Self {
        self.buf.extend_from_slice(&encode_pc858(s));
        self
    }

    /// Write text followed by newline
    pub fn line(&mut self, s: &str) -> &mut Self {
        self.text(s);
        self.newline()
    }

    /// Write empty line
    pub fn newline(&mut self) -> &mut Self {
        self.buf.extend_from_slice(commands::LINE_FEED);
        self
    }

    /// Print and feed n lines
    pub fn feed(&mut self, lines: u8) -> &mut Self {
        self.buf.extend_from_slice(commands::FEED_LINES);
        self.buf.push(lines);
        self
    }

    /// Write the Euro glyph of the selected code page
    pub fn euro(&mut self) -> &mut Self {
        self.buf.push(EURO);
        self
    }

    // === Code Page ===

    /// Select PC858 so that 0xD5 prints as the Euro sign
    pub fn code_page_pc858(&mut self) -> &mut Self {
        self.raw(commands::CODE_PAGE_PC858)
    }

    // === Alignment ===

    /// Align text to center
    pub fn center(&mut self) -> &mut Self {
        self.raw(commands::ALIGN_CENTER)
    }

    /// Align text to left (default)
    pub fn left(&mut self) -> &mut Self {
        self.raw(commands::ALIGN_LEFT)
    }

    /// Align text to right
    pub fn right(&mut self) -> &mut Self {
        self.raw(commands::ALIGN_RIGHT)
    }

    // === Text Style ===

    /// Enable bold text
    pub fn bold(&mut self) -> &mut Self {
        self.raw(commands::BOLD_ON)
    }

    /// Disable bold text
    pub fn bold_off(&mut self) -> &mut Self {
        self.raw(commands::BOLD_OFF)
    }

    /// Enable double-strike (darker print)
    pub fn emphasize(&mut self) -> &mut Self {
        self.raw(commands::EMPHASIZE_ON)
    }

    /// Disable double-strike
    pub fn emphasize_off(&mut self) -> &mut Self {
        self.raw(commands::EMPHASIZE_OFF)
    }

    /// Enable underline
    pub fn underline(&mut self) -> &mut Self {
        self.raw(commands::UNDERLINE_ON)
    }

    /// Disable underline
    pub fn underline_off(&mut self) -> &mut Self {
        self.raw(commands::UNDERLINE_OFF)
    }

    /// Double width and height
    pub fn double_size(&mut self) -> &mut Self {
        self.raw(commands::SIZE_DOUBLE)
    }

    /// Double height only
    pub fn double_height(&mut self) -> &mut Self {
        self.raw(commands::SIZE_DOUBLE_HEIGHT)
    }

    /// Double width only
    pub fn double_width(&mut self) -> &mut Self {
        self.raw(commands::SIZE_DOUBLE_WIDTH)
    }

    /// Triple width and height
    pub fn large(&mut self) -> &mut Self {
        self.raw(commands::SIZE_LARGE)
    }

    /// Reset to normal size
    pub fn reset_size(&mut self) -> &mut Self {
        self.raw(commands::SIZE_NORMAL)
    }

    // === Spacing ===

    /// Wider line spacing
    pub fn line_spacing_wide(&mut self) -> &mut Self {
        self.raw(commands::LINE_SPACING_WIDE)
    }

    /// Default line spacing
    pub fn line_spacing_normal(&mut self) -> &mut Self {
        self.raw(commands::LINE_SPACING_NORMAL)
    }

    /// One dot of extra space between characters
    pub fn char_spacing_wide(&mut self) -> &mut Self {
        self.raw(commands::CHAR_SPACING_WIDE)
    }

    /// Default character spacing
    pub fn char_spacing_normal(&mut self) -> &mut Self {
        self.raw(commands::CHAR_SPACING_NORMAL)
    }

    // === Separators ===

    /// Print a line of '-' characters
    pub fn sep_single(&mut self) -> &mut Self {
        let sep = "-".repeat(self.width);
        self.line(&sep)
    }

    // === Layout Helpers ===

    /// Print left and right text on the same line
    ///
    /// Left text is left-aligned, right text is right-aligned,
    /// with at least one space between them.
    pub fn line_lr(&mut self, left: &str, right: &str) -> &mut Self {
        let row = price_line(left, right, self.width);
        self.line(&row)
    }

    // === Paper Control ===

    /// Cut paper (full cut)
    pub fn cut(&mut self) -> &mut Self {
        self.raw(commands::CUT_FULL)
    }

    /// Partial cut (leave a small connection)
    pub fn cut_partial(&mut self) -> &mut Self {
        self.raw(commands::CUT_PARTIAL)
    }

    // === Peripherals ===

    /// Pulse the cash drawer connector
    pub fn open_drawer(&mut self, pin: DrawerPin) -> &mut Self {
        self.raw(pin.command())
    }

    /// Sound the buzzer
    pub fn beep(&mut self) -> &mut Self {
        self.raw(commands::BEEP)
    }

    // === Raw Commands ===

    /// Write raw bytes directly
    pub fn raw(&mut self, bytes: &[u8]) -> &mut Self {
        self.buf.extend_from_slice(bytes);
        self
    }

    /// Reset printer to default state
    pub fn reset(&mut self) -> &mut Self {
        self.raw(commands::INITIALIZE)
    }

    // === Build ===

    /// Build the final byte buffer
    pub fn build(self) -> Vec<u8> {
        self.buf
    }
}

impl Default for EscPosBuilder {
    fn default() -> Self {
        Self::new(42)
    }
}
