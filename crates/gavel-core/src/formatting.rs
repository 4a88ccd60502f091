//! Outbound text helpers: MarkdownV2 escaping and amount display.

/// Escape text for Telegram MarkdownV2 parse mode.
///
/// Lot names come from the record store and may contain any of the reserved
/// characters; unescaped markup breaks delivery of the whole message.
pub fn escape_markdown(text: &str) -> String {
    const RESERVED: &[char] = &[
        '_', '*', '[', ']', '(', ')', '~', '`', '>', '#', '+', '-', '=', '|', '{', '}', '.', '!',
    ];

    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if RESERVED.contains(&c) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Render a monetary amount: whole rubles without a fraction, otherwise two
/// decimal places.
pub fn format_amount(amount: f64) -> String {
    if amount.fract() == 0.0 {
        format!("{amount:.0}")
    } else {
        format!("{amount:.2}")
    }
}
