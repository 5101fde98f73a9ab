//! What gets printed: jokes, fortunes, receipts, codes
//!
//! Everything here renders into an [`EscPosBuilder`]; sending is left to the caller.

use chrono::{DateTime, TimeZone};
use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use thermal_printer::{EscPosBuilder, pad, truncate, wrap_text};

pub const JOKES: &[&str] = &[
    "Why did the thermal receipt printer break up with its partner?\nIt just couldn’t handle the heat of the moment!",
    "What did the thermal receipt printer say to the paper?\n“You complete me, but I’m still going to roll with it!”",
    "Why did the thermal receipt printer get invited to all the parties?\nBecause it always knew how to print a good time!",
    "How does a thermal receipt printer stay in shape?\nIt does a lot of “roll” exercises!",
    "Why did the thermal receipt printer apply for a job?\nIt wanted to make some “cents” in the world!",
    "What did one thermal receipt printer say to the other at the coffee shop?\n“I can’t espresso how much I love a good brew!”",
    "Why was the thermal receipt printer always calm?\nBecause it knew how to keep its cool under pressure!",
    "What do you call a thermal receipt printer that tells jokes?\nA pun-derful machine!",
    "Why did the thermal receipt printer get a promotion?\nIt always delivered results on time, no matter how heated the situation!",
    "How do thermal receipt printers flirt?\nThey say, “You’ve got my heart racing, and I’m ready to roll with you!”",
];

pub const FORTUNES: &[&str] = &[
    "The best time to plant a tree was 20 years ago. The second best time is now.",
    "Your future is bright, like a thermal printer receipt!",
    "Good things come to those who print.",
    "Today's accomplishments were yesterday's impossibilities.",
    "The journey of a thousand miles begins with a single print.",
    "You will find luck in unexpected places.",
    "A wise person learns from the mistakes of others.",
    "Your hard work will pay off soon.",
    "Adventure awaits those who dare to print.",
    "Success is just around the corner.",
];

/// Pick a random joke
pub fn pick_joke<R: Rng + ?Sized>(rng: &mut R) -> &'static str {
    JOKES.choose(rng).copied().unwrap_or(JOKES[0])
}

/// Pick a random fortune
pub fn pick_fortune<R: Rng + ?Sized>(rng: &mut R) -> &'static str {
    FORTUNES.choose(rng).copied().unwrap_or(FORTUNES[0])
}

/// Six lucky numbers in 1..=99
pub fn lucky_numbers<R: Rng + ?Sized>(rng: &mut R) -> Vec<u8> {
    (0..6).map(|_| rng.gen_range(1..=99)).collect()
}

/// Joke with a centred bold banner
pub fn render_joke(b: &mut EscPosBuilder, joke: &str) {
    let width = b.width();
    b.center().bold().line("JOKE TIME").bold_off().newline();
    b.line(&wrap_text(joke, width));
    b.newline().left();
}

/// Fortune cookie with lucky numbers
pub fn render_fortune(b: &mut EscPosBuilder, fortune: &str, numbers: &[u8]) {
    let width = b.width();
    b.center().bold().line("FORTUNE").bold_off().newline();
    b.line(&wrap_text(fortune, width)).newline();

    let numbers = numbers
        .iter()
        .map(u8::to_string)
        .collect::<Vec<_>>()
        .join(", ");
    b.bold().text("Lucky numbers: ").text(&numbers).bold_off();
    b.newline().newline().left();
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReceiptItem {
    pub name: String,
    pub price: f64,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
}

fn default_quantity() -> u32 {
    1
}

impl ReceiptItem {
    pub fn total(&self) -> f64 {
        self.price * self.quantity as f64
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Receipt {
    pub items: Vec<ReceiptItem>,
    #[serde(default = "default_store_name")]
    pub store_name: String,
}

fn default_store_name() -> String {
    "Receipt Printer Store".to_string()
}

impl Receipt {
    pub fn total(&self) -> f64 {
        self.items.iter().map(ReceiptItem::total).sum()
    }
}

/// Receipt: store header, timestamp, items, total, thanks
pub fn render_receipt<Tz>(b: &mut EscPosBuilder, receipt: &Receipt, now: DateTime<Tz>)
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    let width = b.width();
    let name_width = 20.min(width);

    b.center().double_size().line(&receipt.store_name).reset_size();
    b.line(&now.format("%Y-%m-%d %H:%M:%S").to_string());
    b.left().sep_single();

    for item in &receipt.items {
        b.line(&truncate(&item.name, name_width));
        b.line(&format!(
            "  {}x {:.2} = {:.2}",
            item.quantity,
            item.price,
            item.total()
        ));
    }

    b.sep_single();
    b.bold()
        .line(&format!("{} {:.2}", pad("TOTAL:", name_width, false), receipt.total()))
        .bold_off();
    b.newline().center().line("Takk for handelen!").left();
}

/// QR code with the encoded text underneath
pub fn render_qr(b: &mut EscPosBuilder, text: &str) {
    let width = b.width();
    b.center().qr_code(text, 6).newline();
    b.line(&wrap_text(text, width)).left();
}

/// CODE128 barcode (the printer adds the readable text)
pub fn render_barcode(b: &mut EscPosBuilder, code: &str) {
    b.center().barcode_code128(code).newline().left();
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use thermal_printer::{CharacterProfile, decode, encode_strict, is_encodable};

    fn builder() -> EscPosBuilder {
        EscPosBuilder::new(32, CharacterProfile::Cp1252)
    }

    fn text_of(b: EscPosBuilder) -> String {
        decode(&b.build().unwrap(), CharacterProfile::Cp1252)
    }

    #[test]
    fn test_all_jokes_and_fortunes_printable() {
        for s in JOKES.iter().chain(FORTUNES) {
            assert!(is_encodable(s, CharacterProfile::Cp1252), "{s}");
        }
    }

    #[test]
    fn test_random_picks() {
        let mut rng = StdRng::seed_from_u64(7);
        assert!(JOKES.contains(&pick_joke(&mut rng)));
        assert!(FORTUNES.contains(&pick_fortune(&mut rng)));

        let numbers = lucky_numbers(&mut rng);
        assert_eq!(numbers.len(), 6);
        assert!(numbers.iter().all(|n| (1..=99).contains(n)));
    }

    #[test]
    fn test_receipt_totals() {
        let receipt: Receipt = serde_json::from_str(
            r#"{"items":[{"name":"Kaffe","price":35.5,"quantity":2},{"name":"Bolle","price":20}]}"#,
        )
        .unwrap();

        assert_eq!(receipt.store_name, "Receipt Printer Store");
        assert_eq!(receipt.items[1].quantity, 1);
        assert!((receipt.total() - 91.0).abs() < 1e-9);
    }

    #[test]
    fn test_render_receipt() {
        let receipt = Receipt {
            store_name: "Bakeriet på hjørnet".into(),
            items: vec![ReceiptItem {
                name: "Skolebolle med ekstra kokos".into(),
                price: 29.0,
                quantity: 3,
            }],
        };
        let now = Utc.with_ymd_and_hms(2025, 8, 14, 12, 30, 0).unwrap();

        let mut b = builder();
        render_receipt(&mut b, &receipt, now);
        let data = b.build().unwrap();

        // Store name printed double size, then back to normal
        let mut header = vec![0x1D, 0x21, 0x11];
        header.extend(encode_strict("Bakeriet på hjørnet\n", CharacterProfile::Cp1252).unwrap());
        header.extend([0x1D, 0x21, 0x00]);
        assert!(data.windows(header.len()).any(|w| w == header.as_slice()));

        let text = decode(&data, CharacterProfile::Cp1252);

        assert!(text.contains("Bakeriet på hjørnet\n"));
        assert!(text.contains("2025-08-14 12:30:00\n"));
        assert!(text.contains("Skolebolle med ekstr\n"));
        assert!(text.contains("  3x 29.00 = 87.00\n"));
        assert!(text.contains("TOTAL:               87.00\n"));
        assert!(text.contains("Takk for handelen!"));
    }

    #[test]
    fn test_render_joke_wraps() {
        let mut b = builder();
        render_joke(&mut b, JOKES[7]);
        let text = text_of(b);
        assert!(text.contains("JOKE TIME"));
        assert!(text.contains("What do you call a thermal\nreceipt printer that tells\njokes?\n"));
    }

    #[test]
    fn test_render_fortune() {
        let mut b = builder();
        render_fortune(&mut b, FORTUNES[2], &[1, 22, 99]);
        let text = text_of(b);
        assert!(text.contains("Good things come to those who\nprint."));
        assert!(text.contains("Lucky numbers: 1, 22, 99"));
    }

    #[test]
    fn test_render_qr_and_barcode() {
        let mut b = builder();
        render_qr(&mut b, "https://example.org");
        assert!(text_of(b).contains("https://example.org"));

        let mut b = builder();
        render_barcode(&mut b, "ÆØÅ");
        assert!(b.build().is_err());
    }
}
