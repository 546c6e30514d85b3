//! Invoice PDF rendering (A4, built-in Helvetica).

use printpdf::{
    BuiltinFont, IndirectFontRef, Line, Mm, PdfDocument, PdfDocumentReference, PdfLayerReference,
    Point,
};
use rust_decimal::Decimal;
use service_core::error::AppError;
use std::io::BufWriter;
use std::time::Instant;
use thiserror::Error;

use crate::models::{Client, Company, Invoice, LineItem};
use crate::services::metrics::PDF_RENDER_DURATION;

const PAGE_WIDTH: f32 = 210.0;
const PAGE_HEIGHT: f32 = 297.0;
const LEFT: f32 = 15.0;
const RIGHT: f32 = 195.0;
const TOP: f32 = 282.0;
const BOTTOM: f32 = 25.0;
const ROW_HEIGHT: f32 = 6.0;

const X_DESCRIPTION: f32 = LEFT;
const X_QUANTITY: f32 = 105.0;
const X_UNIT_PRICE: f32 = 128.0;
const X_TAX_RATE: f32 = 153.0;
const X_LINE_TOTAL: f32 = 170.0;

/// Longest description printed on one row.
const DESCRIPTION_CHARS: usize = 48;

#[derive(Debug, Error)]
pub enum PdfError {
    #[error("PDF rendering failed: {0}")]
    Render(String),
}

impl From<PdfError> for AppError {
    fn from(err: PdfError) -> Self {
        AppError::InternalError(anyhow::anyhow!(err))
    }
}

/// Everything printed on an invoice.
pub struct InvoiceDocument<'a> {
    pub company: &'a Company,
    pub client: &'a Client,
    pub invoice: &'a Invoice,
    pub items: &'a [LineItem],
}

struct Canvas {
    doc: PdfDocumentReference,
    layer: PdfLayerReference,
    font: IndirectFontRef,
    bold: IndirectFontRef,
    y: f32,
    pages: usize,
}

impl Canvas {
    fn new(title: &str) -> Result<Self, PdfError> {
        let (doc, page, layer) = PdfDocument::new(title, Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1");
        let layer = doc.get_page(page).get_layer(layer);
        let font = doc
            .add_builtin_font(BuiltinFont::Helvetica)
            .map_err(|e| PdfError::Render(e.to_string()))?;
        let bold = doc
            .add_builtin_font(BuiltinFont::HelveticaBold)
            .map_err(|e| PdfError::Render(e.to_string()))?;
        Ok(Self {
            doc,
            layer,
            font,
            bold,
            y: TOP,
            pages: 1,
        })
    }

    fn text(&self, text: &str, size: f32, x: f32) {
        self.layer.use_text(text, size, Mm(x), Mm(self.y), &self.font);
    }

    fn bold(&self, text: &str, size: f32, x: f32) {
        self.layer.use_text(text, size, Mm(x), Mm(self.y), &self.bold);
    }

    fn rule(&self) {
        self.layer.add_line(Line {
            points: vec![
                (Point::new(Mm(LEFT), Mm(self.y)), false),
                (Point::new(Mm(RIGHT), Mm(self.y)), false),
            ],
            is_closed: false,
        });
    }

    fn down(&mut self, mm: f32) {
        self.y -= mm;
    }

    /// Start a new page when fewer than `needed` millimetres remain.
    fn ensure_room(&mut self, needed: f32) -> bool {
        if self.y - needed >= BOTTOM {
            return false;
        }
        let (page, layer) = self
            .doc
            .add_page(Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), format!("Layer {}", self.pages + 1));
        self.layer = self.doc.get_page(page).get_layer(layer);
        self.pages += 1;
        self.y = TOP;
        true
    }

    fn finish(self) -> Result<Vec<u8>, PdfError> {
        let mut writer = BufWriter::new(Vec::<u8>::new());
        self.doc
            .save(&mut writer)
            .map_err(|e| PdfError::Render(e.to_string()))?;
        writer
            .into_inner()
            .map_err(|e| PdfError::Render(e.to_string()))
    }
}

fn money(amount: Decimal) -> String {
    format!("{:.2} EUR", amount)
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let mut short: String = text.chars().take(max.saturating_sub(3)).collect();
    short.push_str("...");
    short
}

fn party_lines(
    name: &str,
    company_code: &Option<String>,
    vat_code: &Option<String>,
    address: &Option<String>,
    city: &Option<String>,
    postal_code: &Option<String>,
    country: &str,
) -> Vec<String> {
    let mut lines = vec![name.to_string()];
    if let Some(code) = company_code {
        lines.push(format!("Company code: {}", code));
    }
    if let Some(vat) = vat_code {
        lines.push(format!("VAT code: {}", vat));
    }
    if let Some(address) = address {
        lines.push(address.clone());
    }
    let locality = [postal_code.as_deref(), city.as_deref()]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join(" ");
    if locality.is_empty() {
        lines.push(country.to_string());
    } else {
        lines.push(format!("{}, {}", locality, country));
    }
    lines
}

fn item_header(canvas: &mut Canvas) {
    canvas.bold("Description", 9.0, X_DESCRIPTION);
    canvas.bold("Qty", 9.0, X_QUANTITY);
    canvas.bold("Price", 9.0, X_UNIT_PRICE);
    canvas.bold("VAT", 9.0, X_TAX_RATE);
    canvas.bold("Amount", 9.0, X_LINE_TOTAL);
    canvas.down(2.5);
    canvas.rule();
    canvas.down(5.0);
}

fn draw(canvas: &mut Canvas, doc: &InvoiceDocument<'_>) {
    let company = doc.company;
    let invoice = doc.invoice;

    // Title block
    canvas.bold(&format!("INVOICE {}", invoice.invoice_number), 16.0, LEFT);
    canvas.down(7.0);
    canvas.text(&format!("Invoice date: {}", invoice.invoice_date), 10.0, LEFT);
    canvas.down(5.0);
    canvas.text(&format!("Due date: {}", invoice.due_date), 10.0, LEFT);
    if let Some(reference) = &invoice.payment_reference {
        canvas.down(5.0);
        canvas.text(&format!("Payment reference: {}", reference), 10.0, LEFT);
    }
    canvas.down(8.0);
    canvas.rule();
    canvas.down(8.0);

    // Seller and buyer side by side
    canvas.bold("Seller", 11.0, LEFT);
    canvas.bold("Buyer", 11.0, 110.0);
    canvas.down(6.0);

    let mut seller = party_lines(
        company.legal_name.as_deref().unwrap_or(&company.name),
        &company.company_code,
        &company.vat_code,
        &company.registration_address,
        &company.city,
        &company.postal_code,
        &company.country,
    );
    if let Some(bank) = &company.bank_name {
        seller.push(format!("Bank: {}", bank));
    }
    if let Some(account) = &company.bank_account {
        seller.push(format!("IBAN: {}", account));
    }
    if let Some(swift) = &company.bank_swift {
        seller.push(format!("SWIFT: {}", swift));
    }

    let client = doc.client;
    let buyer = party_lines(
        client.legal_name.as_deref().unwrap_or(&client.name),
        &client.company_code,
        &client.vat_code,
        &client.address,
        &client.city,
        &client.postal_code,
        &client.country,
    );

    let rows = seller.len().max(buyer.len());
    for row in 0..rows {
        if let Some(line) = seller.get(row) {
            canvas.text(&truncate(line, 50), 9.0, LEFT);
        }
        if let Some(line) = buyer.get(row) {
            canvas.text(&truncate(line, 45), 9.0, 110.0);
        }
        canvas.down(4.5);
    }
    canvas.down(6.0);

    // Items
    item_header(canvas);
    for (index, item) in doc.items.iter().enumerate() {
        if canvas.ensure_room(ROW_HEIGHT) {
            item_header(canvas);
        }
        let description = format!("{}. {}", index + 1, item.description);
        canvas.text(&truncate(&description, DESCRIPTION_CHARS), 9.0, X_DESCRIPTION);
        canvas.text(&format!("{} {}", item.quantity.normalize(), item.unit), 9.0, X_QUANTITY);
        canvas.text(&format!("{:.2}", item.unit_price), 9.0, X_UNIT_PRICE);
        canvas.text(&format!("{}%", item.tax_rate), 9.0, X_TAX_RATE);
        canvas.text(&money(item.line_total), 9.0, X_LINE_TOTAL);
        canvas.down(ROW_HEIGHT);
    }

    // Totals
    canvas.ensure_room(30.0);
    canvas.down(2.0);
    canvas.rule();
    canvas.down(7.0);
    canvas.text("Subtotal:", 10.0, 135.0);
    canvas.text(&money(invoice.subtotal), 10.0, X_LINE_TOTAL);
    canvas.down(6.0);
    canvas.text("VAT:", 10.0, 135.0);
    canvas.text(&money(invoice.tax_amount), 10.0, X_LINE_TOTAL);
    canvas.down(7.0);
    canvas.bold("Total:", 12.0, 135.0);
    canvas.bold(&money(invoice.total), 12.0, X_LINE_TOTAL);
    canvas.down(12.0);

    // Notes
    if let Some(notes) = invoice.notes.as_deref().filter(|n| !n.trim().is_empty()) {
        canvas.ensure_room(12.0);
        canvas.bold("Notes", 10.0, LEFT);
        canvas.down(5.5);
        for line in notes.lines() {
            canvas.ensure_room(5.0);
            canvas.text(&truncate(line, 95), 9.0, LEFT);
            canvas.down(5.0);
        }
    }
}

/// Render the invoice to PDF bytes.
pub fn render_invoice_pdf(doc: &InvoiceDocument<'_>) -> Result<Vec<u8>, PdfError> {
    let started = Instant::now();

    let result = Canvas::new(&format!("Invoice {}", doc.invoice.invoice_number)).and_then(|mut canvas| {
        draw(&mut canvas, doc);
        canvas.finish()
    });

    let outcome = if result.is_ok() { "success" } else { "error" };
    PDF_RENDER_DURATION
        .with_label_values(&[outcome])
        .observe(started.elapsed().as_secs_f64());

    result
}
