// Digest rendering: turns a run's deals into a notification body
use crate::offer::{FlightDeal, Segment};
use crate::orchestrator::DealDigest;
use rust_decimal::Decimal;
use std::fmt::Write;

const TIME_FORMAT: &str = "%H:%M";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Digest {
    pub subject: String,
    pub text_body: String,
    pub html_body: String,
    pub deal_count: usize,
}

// Two decimal places, always
fn money(amount: Decimal) -> String {
    let mut rounded = amount.round_dp(2);
    rounded.rescale(2);
    rounded.to_string()
}

fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

fn segment_line(segment: &Segment) -> String {
    format!(
        "{} → {} | {} | {} - {}",
        segment.from_code,
        segment.to_code,
        segment.flight_designator(),
        segment.departure_at.format(TIME_FORMAT),
        segment.arrival_at.format(TIME_FORMAT),
    )
}

#[derive(Debug, Default, Clone, Copy)]
pub struct DigestComposer;

impl DigestComposer {
    pub fn new() -> Self {
        Self
    }

    // None when there is nothing to report
    pub fn compose(&self, digest: &DealDigest) -> Option<Digest> {
        if digest.is_empty() {
            return None;
        }

        let count = digest.deal_count();
        let threshold = format!("{} {}", money(digest.threshold), digest.currency);
        let noun = if count == 1 { "flight" } else { "flights" };

        Some(Digest {
            subject: format!("Flight Deals Alert: {} {} under {}", count, noun, threshold),
            text_body: self.render_text(digest, count, noun, &threshold),
            html_body: self.render_html(digest, count, noun, &threshold),
            deal_count: count,
        })
    }

    fn render_text(
        &self,
        digest: &DealDigest,
        count: usize,
        noun: &str,
        threshold: &str,
    ) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "Found {} {} from {} under {} ({} destinations searched)",
            count, noun, digest.origin, threshold, digest.destinations_searched
        );

        for deal in &digest.deals {
            out.push('\n');
            self.text_block(&mut out, &digest.origin, deal);
        }

        out.push_str("\n--\nThis is an automated alert from your flight price monitor.\n");
        out.push_str("Prices may change quickly - book soon if interested!\n");
        out
    }

    fn text_block(&self, out: &mut String, origin: &str, deal: &FlightDeal) {
        let _ = writeln!(out, "{} → {} → {}", origin, deal.destination, origin);
        let _ = writeln!(out, "{} {}", money(deal.price), deal.currency);

        let _ = writeln!(out, "Outbound: {}", deal.window.departure_date);
        for segment in &deal.outbound_segments {
            let _ = writeln!(out, "  {}", segment_line(segment));
        }

        if !deal.is_one_way() {
            let _ = writeln!(out, "Return: {}", deal.window.return_date);
            for segment in &deal.inbound_segments {
                let _ = writeln!(out, "  {}", segment_line(segment));
            }
        }

        let _ = writeln!(out, "Class: {}", deal.booking_class);
    }

    fn render_html(
        &self,
        digest: &DealDigest,
        count: usize,
        noun: &str,
        threshold: &str,
    ) -> String {
        let mut out = String::new();
        out.push_str("<html>\n<body style=\"font-family: Arial, sans-serif;\">\n");
        out.push_str("<h2 style=\"color: #2c3e50;\">Flight Deals Found!</h2>\n");
        let _ = writeln!(
            out,
            "<p>Found {} {} from {} under {}</p>\n<hr>",
            count,
            noun,
            escape_html(&digest.origin),
            escape_html(threshold)
        );

        for deal in &digest.deals {
            self.html_block(&mut out, &digest.origin, deal);
        }

        out.push_str("<hr>\n<p style=\"color: #7f8c8d; font-size: 12px;\">\n");
        out.push_str("This is an automated alert from your flight price monitor.<br>\n");
        out.push_str("Prices may change quickly - book soon if interested!\n</p>\n");
        out.push_str("</body>\n</html>\n");
        out
    }

    fn html_block(&self, out: &mut String, origin: &str, deal: &FlightDeal) {
        let origin = escape_html(origin);
        out.push_str(concat!(
            "<div style=\"border: 1px solid #ddd; padding: 15px; ",
            "margin-bottom: 20px; border-radius: 5px;\">\n",
        ));
        let _ = writeln!(
            out,
            "<h3 style=\"color: #2c3e50;\">{} → {} → {}</h3>",
            origin,
            escape_html(&deal.destination),
            origin
        );
        let _ = writeln!(
            out,
            "<p style=\"font-size: 24px; color: #27ae60; font-weight: bold;\">{} {}</p>",
            money(deal.price),
            escape_html(&deal.currency)
        );

        let _ = writeln!(out, "<h4>Outbound: {}</h4>\n<ul>", deal.window.departure_date);
        for segment in &deal.outbound_segments {
            let _ = writeln!(out, "<li>{}</li>", escape_html(&segment_line(segment)));
        }
        out.push_str("</ul>\n");

        if !deal.is_one_way() {
            let _ = writeln!(out, "<h4>Return: {}</h4>\n<ul>", deal.window.return_date);
            for segment in &deal.inbound_segments {
                let _ = writeln!(out, "<li>{}</li>", escape_html(&segment_line(segment)));
            }
            out.push_str("</ul>\n");
        }

        let _ = writeln!(
            out,
            "<p><strong>Class:</strong> {}</p>\n</div>",
            escape_html(&deal.booking_class)
        );
    }
}
