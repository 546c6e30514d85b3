//! Dashboard figures, financial reports and CSV exports.

use chrono::{Datelike, Months, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use service_core::error::AppError;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::instrument;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::{
    ActivityLog, Client, Company, Invoice, InvoiceStatus, LineItem, ListClientsFilter,
    ListInvoicesFilter,
};
use crate::services::entitlement::{EntitlementChecker, PlanUsage};
use crate::services::invoices::InvoiceService;
use crate::services::store::InvoicingStore;

const RECENT_INVOICES: usize = 5;
const OVERDUE_INVOICES: usize = 5;
const RECENT_ACTIVITY: i64 = 10;
const CHART_MONTHS: u32 = 6;
const TOP_CLIENTS: usize = 10;

/// UTF-8 byte order mark, so spreadsheet tools detect the encoding.
const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DashboardStats {
    pub total_clients: i64,
    pub total_products: i64,
    pub invoices_this_month: i64,
    pub invoices_this_year: i64,
    pub revenue_this_month: Decimal,
    pub revenue_this_year: Decimal,
    pub outstanding: Decimal,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct MonthlyRevenuePoint {
    #[schema(example = "2024-05")]
    pub month: String,
    pub revenue: Decimal,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Dashboard {
    pub stats: DashboardStats,
    pub recent_invoices: Vec<Invoice>,
    pub overdue_invoices: Vec<Invoice>,
    pub recent_activity: Vec<ActivityLog>,
    pub revenue_chart: Vec<MonthlyRevenuePoint>,
    pub usage: PlanUsage,
}

#[derive(Debug, Clone, Default, Serialize, ToSchema)]
pub struct MonthlyRevenue {
    pub month: String,
    pub revenue: Decimal,
    pub vat: Decimal,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ClientRevenue {
    pub client_id: Uuid,
    pub name: String,
    pub total: Decimal,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RevenueReport {
    pub date_from: NaiveDate,
    pub date_to: NaiveDate,
    pub invoice_count: i64,
    pub total_net: Decimal,
    pub total_vat: Decimal,
    pub total_revenue: Decimal,
    pub monthly: Vec<MonthlyRevenue>,
    pub top_clients: Vec<ClientRevenue>,
}

#[derive(Debug, Clone, Default, Serialize, ToSchema)]
pub struct VatRateTotals {
    #[schema(example = 21)]
    pub rate: i32,
    pub base: Decimal,
    pub vat: Decimal,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct VatReport {
    pub year: i32,
    pub quarter: u32,
    pub quarter_start: NaiveDate,
    pub quarter_end: NaiveDate,
    pub invoice_count: i64,
    pub breakdown: Vec<VatRateTotals>,
    pub total_base: Decimal,
    pub total_vat: Decimal,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ClientSummary {
    pub client_id: Uuid,
    pub name: String,
    pub is_active: bool,
    pub invoice_count: i64,
    pub total_invoiced: Decimal,
    pub total_paid: Decimal,
    pub outstanding: Decimal,
}

fn month_key(date: NaiveDate) -> String {
    format!("{:04}-{:02}", date.year(), date.month())
}

fn first_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

/// First and last day of a calendar quarter.
pub fn quarter_bounds(year: i32, quarter: u32) -> Result<(NaiveDate, NaiveDate), AppError> {
    let invalid = || AppError::BadRequest(anyhow::anyhow!("Invalid quarter {year} Q{quarter}"));
    if !(1..=4).contains(&quarter) {
        return Err(invalid());
    }
    let start = NaiveDate::from_ymd_opt(year, (quarter - 1) * 3 + 1, 1).ok_or_else(invalid)?;
    let end = start
        .checked_add_months(Months::new(3))
        .and_then(|next| next.pred_opt())
        .ok_or_else(invalid)?;
    Ok((start, end))
}

/// Quarter containing `date`.
pub fn quarter_of(date: NaiveDate) -> u32 {
    (date.month() - 1) / 3 + 1
}

fn paid_between(invoice: &Invoice, from: NaiveDate, to: NaiveDate) -> bool {
    invoice.status() == InvoiceStatus::Paid
        && invoice.paid_date.is_some_and(|paid| paid >= from && paid <= to)
}

fn csv_error(e: impl std::fmt::Display) -> AppError {
    AppError::InternalError(anyhow::anyhow!("CSV export failed: {}", e))
}

fn money(amount: Decimal) -> String {
    format!("{:.2}", amount)
}

/// Invoice list export: comma separated, BOM prefixed.
pub fn invoices_csv(invoices: &[Invoice], clients: &HashMap<Uuid, Client>) -> Result<Vec<u8>, AppError> {
    let mut writer = csv::Writer::from_writer(UTF8_BOM.to_vec());
    writer
        .write_record([
            "Sąskaitos Nr.",
            "Data",
            "Terminas",
            "Klientas",
            "Suma be PVM",
            "PVM",
            "Viso",
            "Būsena",
            "Apmokėta",
        ])
        .map_err(csv_error)?;

    for invoice in invoices {
        let client = clients
            .get(&invoice.client_id)
            .map(|c| c.name.as_str())
            .unwrap_or_default();
        writer
            .write_record([
                invoice.invoice_number.clone(),
                invoice.invoice_date.to_string(),
                invoice.due_date.to_string(),
                client.to_string(),
                money(invoice.subtotal),
                money(invoice.tax_amount),
                money(invoice.total),
                invoice.status.clone(),
                invoice.paid_date.map(|d| d.to_string()).unwrap_or_default(),
            ])
            .map_err(csv_error)?;
    }

    writer.into_inner().map_err(csv_error)
}

/// VAT export: semicolon separated, one row per line item.
pub fn vat_csv(
    invoices: &[(Invoice, Vec<LineItem>)],
    clients: &HashMap<Uuid, Client>,
) -> Result<Vec<u8>, AppError> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b';')
        .from_writer(UTF8_BOM.to_vec());
    writer
        .write_record([
            "Dokumento tipas",
            "Dokumento numeris",
            "Dokumento data",
            "Pirkėjo kodas",
            "Pirkėjo PVM kodas",
            "Pirkėjo pavadinimas",
            "Apmokestinama vertė",
            "PVM suma",
            "PVM tarifas",
        ])
        .map_err(csv_error)?;

    for (invoice, items) in invoices {
        let client = clients.get(&invoice.client_id);
        for item in items {
            writer
                .write_record([
                    "SF".to_string(),
                    invoice.invoice_number.clone(),
                    invoice.invoice_date.to_string(),
                    client.and_then(|c| c.company_code.clone()).unwrap_or_default(),
                    client.and_then(|c| c.vat_code.clone()).unwrap_or_default(),
                    client.map(|c| c.name.clone()).unwrap_or_default(),
                    money(item.line_total),
                    money(item.line_tax),
                    item.tax_rate.to_string(),
                ])
                .map_err(csv_error)?;
        }
    }

    writer.into_inner().map_err(csv_error)
}

/// Base and VAT per rate, ascending by rate.
pub fn vat_breakdown<'a>(items: impl IntoIterator<Item = &'a LineItem>) -> Vec<VatRateTotals> {
    let mut by_rate: BTreeMap<i32, VatRateTotals> = BTreeMap::new();
    for item in items {
        let entry = by_rate.entry(item.tax_rate).or_insert_with(|| VatRateTotals {
            rate: item.tax_rate,
            ..VatRateTotals::default()
        });
        entry.base += item.line_total;
        entry.vat += item.line_tax;
    }
    by_rate.into_values().collect()
}

#[derive(Clone)]
pub struct ReportService {
    store: Arc<dyn InvoicingStore>,
    invoices: InvoiceService,
    entitlements: EntitlementChecker,
}

impl ReportService {
    pub fn new(
        store: Arc<dyn InvoicingStore>,
        invoices: InvoiceService,
        entitlements: EntitlementChecker,
    ) -> Self {
        Self {
            store,
            invoices,
            entitlements,
        }
    }

    async fn all_invoices(&self, company_id: Uuid) -> Result<Vec<Invoice>, AppError> {
        self.invoices.refresh_overdue(company_id).await?;
        self.store
            .list_invoices(company_id, &ListInvoicesFilter::all())
            .await
    }

    async fn clients_by_id(&self, company_id: Uuid) -> Result<HashMap<Uuid, Client>, AppError> {
        let filter = ListClientsFilter {
            include_inactive: true,
            ..ListClientsFilter::default()
        };
        Ok(self
            .store
            .list_clients(company_id, &filter)
            .await?
            .into_iter()
            .map(|c| (c.client_id, c))
            .collect())
    }

    async fn issued_in_quarter(
        &self,
        company_id: Uuid,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<(Invoice, Vec<LineItem>)>, AppError> {
        let mut invoices: Vec<Invoice> = self
            .all_invoices(company_id)
            .await?
            .into_iter()
            .filter(|inv| {
                inv.status().is_issued() && inv.invoice_date >= start && inv.invoice_date <= end
            })
            .collect();
        invoices.sort_by(|a, b| a.invoice_date.cmp(&b.invoice_date).then_with(|| a.invoice_number.cmp(&b.invoice_number)));

        let mut with_items = Vec::with_capacity(invoices.len());
        for invoice in invoices {
            let items = self.store.get_line_items(company_id, invoice.invoice_id).await?;
            with_items.push((invoice, items));
        }
        Ok(with_items)
    }

    #[instrument(skip(self, company), fields(company_id = %company.company_id))]
    pub async fn dashboard(&self, user_id: Uuid, company: &Company) -> Result<Dashboard, AppError> {
        let company_id = company.company_id;
        let invoices = self.all_invoices(company_id).await?;
        let today = Utc::now().date_naive();
        let month_start = first_of_month(today);
        let year_start = NaiveDate::from_ymd_opt(today.year(), 1, 1).unwrap_or(month_start);

        let sum_paid_since = |since: NaiveDate| -> Decimal {
            invoices
                .iter()
                .filter(|inv| paid_between(inv, since, NaiveDate::MAX))
                .map(|inv| inv.total)
                .sum()
        };

        let usage = self.entitlements.usage(company).await?;
        let stats = DashboardStats {
            total_clients: usage.clients.used,
            total_products: usage.products.used,
            invoices_this_month: invoices.iter().filter(|i| i.invoice_date >= month_start).count() as i64,
            invoices_this_year: invoices.iter().filter(|i| i.invoice_date >= year_start).count() as i64,
            revenue_this_month: sum_paid_since(month_start),
            revenue_this_year: sum_paid_since(year_start),
            outstanding: invoices
                .iter()
                .filter(|inv| inv.status().is_outstanding())
                .map(|inv| inv.total)
                .sum(),
        };

        let mut recent = invoices.clone();
        recent.sort_by(|a, b| b.created_utc.cmp(&a.created_utc));
        recent.truncate(RECENT_INVOICES);

        let mut overdue: Vec<Invoice> = invoices
            .iter()
            .filter(|inv| inv.status() == InvoiceStatus::Overdue)
            .cloned()
            .collect();
        overdue.sort_by_key(|inv| inv.due_date);
        overdue.truncate(OVERDUE_INVOICES);

        let revenue_chart = (0..CHART_MONTHS)
            .rev()
            .filter_map(|back| month_start.checked_sub_months(Months::new(back)))
            .map(|start| {
                let end = start
                    .checked_add_months(Months::new(1))
                    .and_then(|next| next.pred_opt())
                    .unwrap_or(start);
                MonthlyRevenuePoint {
                    month: month_key(start),
                    revenue: invoices
                        .iter()
                        .filter(|inv| paid_between(inv, start, end))
                        .map(|inv| inv.total)
                        .sum(),
                }
            })
            .collect();

        Ok(Dashboard {
            stats,
            recent_invoices: recent,
            overdue_invoices: overdue,
            recent_activity: self.store.list_activity(user_id, RECENT_ACTIVITY).await?,
            revenue_chart,
            usage,
        })
    }

    /// Paid invoices by paid date. Defaults to the current year to date.
    #[instrument(skip(self, company), fields(company_id = %company.company_id))]
    pub async fn revenue(
        &self,
        company: &Company,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> Result<RevenueReport, AppError> {
        self.entitlements.ensure_reports(company)?;
        let today = Utc::now().date_naive();
        let date_from = from.unwrap_or_else(|| NaiveDate::from_ymd_opt(today.year(), 1, 1).unwrap_or(today));
        let date_to = to.unwrap_or(today);

        let mut paid: Vec<Invoice> = self
            .all_invoices(company.company_id)
            .await?
            .into_iter()
            .filter(|inv| paid_between(inv, date_from, date_to))
            .collect();
        paid.sort_by_key(|inv| inv.paid_date);

        let mut monthly: BTreeMap<String, MonthlyRevenue> = BTreeMap::new();
        let mut per_client: HashMap<Uuid, Decimal> = HashMap::new();
        for invoice in &paid {
            if let Some(paid_date) = invoice.paid_date {
                let key = month_key(paid_date);
                let entry = monthly.entry(key.clone()).or_insert_with(|| MonthlyRevenue {
                    month: key,
                    ..MonthlyRevenue::default()
                });
                entry.revenue += invoice.total;
                entry.vat += invoice.tax_amount;
                entry.count += 1;
            }
            *per_client.entry(invoice.client_id).or_default() += invoice.total;
        }

        let clients = self.clients_by_id(company.company_id).await?;
        let mut top_clients: Vec<ClientRevenue> = per_client
            .into_iter()
            .map(|(client_id, total)| ClientRevenue {
                client_id,
                name: clients.get(&client_id).map(|c| c.name.clone()).unwrap_or_default(),
                total,
            })
            .collect();
        top_clients.sort_by(|a, b| b.total.cmp(&a.total).then_with(|| a.name.cmp(&b.name)));
        top_clients.truncate(TOP_CLIENTS);

        Ok(RevenueReport {
            date_from,
            date_to,
            invoice_count: paid.len() as i64,
            total_net: paid.iter().map(|i| i.subtotal).sum(),
            total_vat: paid.iter().map(|i| i.tax_amount).sum(),
            total_revenue: paid.iter().map(|i| i.total).sum(),
            monthly: monthly.into_values().collect(),
            top_clients,
        })
    }

    /// VAT of issued invoices dated in the quarter, grouped by rate.
    #[instrument(skip(self, company), fields(company_id = %company.company_id))]
    pub async fn vat(&self, company: &Company, year: i32, quarter: u32) -> Result<VatReport, AppError> {
        self.entitlements.ensure_reports(company)?;
        let (quarter_start, quarter_end) = quarter_bounds(year, quarter)?;
        let issued = self
            .issued_in_quarter(company.company_id, quarter_start, quarter_end)
            .await?;

        let breakdown = vat_breakdown(issued.iter().flat_map(|(_, items)| items.iter()));
        Ok(VatReport {
            year,
            quarter,
            quarter_start,
            quarter_end,
            invoice_count: issued.len() as i64,
            total_base: breakdown.iter().map(|r| r.base).sum(),
            total_vat: breakdown.iter().map(|r| r.vat).sum(),
            breakdown,
        })
    }

    /// Invoice totals per client, largest first.
    #[instrument(skip(self, company), fields(company_id = %company.company_id))]
    pub async fn clients(&self, company: &Company) -> Result<Vec<ClientSummary>, AppError> {
        self.entitlements.ensure_reports(company)?;
        let invoices = self.all_invoices(company.company_id).await?;
        let clients = self.clients_by_id(company.company_id).await?;

        let mut summaries: Vec<ClientSummary> = clients
            .values()
            .map(|client| {
                let mine = invoices.iter().filter(|inv| inv.client_id == client.client_id);
                let mut summary = ClientSummary {
                    client_id: client.client_id,
                    name: client.name.clone(),
                    is_active: client.is_active,
                    invoice_count: 0,
                    total_invoiced: Decimal::ZERO,
                    total_paid: Decimal::ZERO,
                    outstanding: Decimal::ZERO,
                };
                for invoice in mine {
                    summary.invoice_count += 1;
                    summary.total_invoiced += invoice.total;
                    match invoice.status() {
                        InvoiceStatus::Paid => summary.total_paid += invoice.total,
                        status if status.is_outstanding() => summary.outstanding += invoice.total,
                        _ => {}
                    }
                }
                summary
            })
            .collect();
        summaries.sort_by(|a, b| {
            b.total_invoiced
                .cmp(&a.total_invoiced)
                .then_with(|| a.name.cmp(&b.name))
        });
        Ok(summaries)
    }

    #[instrument(skip(self, company), fields(company_id = %company.company_id))]
    pub async fn export_invoices(
        &self,
        company: &Company,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> Result<Vec<u8>, AppError> {
        self.entitlements.ensure_reports(company)?;
        let mut invoices: Vec<Invoice> = self
            .all_invoices(company.company_id)
            .await?
            .into_iter()
            .filter(|inv| from.map_or(true, |d| inv.invoice_date >= d))
            .filter(|inv| to.map_or(true, |d| inv.invoice_date <= d))
            .collect();
        invoices.sort_by(|a, b| a.invoice_date.cmp(&b.invoice_date).then_with(|| a.invoice_number.cmp(&b.invoice_number)));

        let clients = self.clients_by_id(company.company_id).await?;
        invoices_csv(&invoices, &clients)
    }

    #[instrument(skip(self, company), fields(company_id = %company.company_id))]
    pub async fn export_vat(&self, company: &Company, year: i32, quarter: u32) -> Result<Vec<u8>, AppError> {
        self.entitlements.ensure_reports(company)?;
        let (start, end) = quarter_bounds(year, quarter)?;
        let issued = self.issued_in_quarter(company.company_id, start, end).await?;
        let clients = self.clients_by_id(company.company_id).await?;
        vat_csv(&issued, &clients)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn item(rate: i32, total: Decimal, tax: Decimal) -> LineItem {
        LineItem {
            line_item_id: Uuid::new_v4(),
            invoice_id: Uuid::nil(),
            company_id: Uuid::nil(),
            product_id: None,
            description: "Darbas".to_string(),
            quantity: dec!(1),
            unit: "vnt.".to_string(),
            unit_price: total,
            tax_rate: rate,
            line_total: total,
            line_tax: tax,
            position: 0,
            created_utc: Utc::now(),
        }
    }

    fn invoice(number: &str, client_id: Uuid) -> Invoice {
        Invoice {
            invoice_id: Uuid::new_v4(),
            company_id: Uuid::nil(),
            user_id: Uuid::nil(),
            client_id,
            invoice_number: number.to_string(),
            invoice_date: date(2024, 2, 10),
            due_date: date(2024, 2, 24),
            status: "sent".to_string(),
            subtotal: dec!(100.00),
            tax_amount: dec!(21.00),
            total: dec!(121.00),
            notes: None,
            internal_notes: None,
            payment_reference: None,
            paid_date: None,
            paid_amount: None,
            sent_utc: None,
            created_utc: Utc::now(),
            updated_utc: Utc::now(),
        }
    }

    #[test]
    fn quarter_bounds_cover_calendar_quarters() {
        assert_eq!(quarter_bounds(2024, 1).unwrap(), (date(2024, 1, 1), date(2024, 3, 31)));
        assert_eq!(quarter_bounds(2024, 2).unwrap(), (date(2024, 4, 1), date(2024, 6, 30)));
        assert_eq!(quarter_bounds(2024, 4).unwrap(), (date(2024, 10, 1), date(2024, 12, 31)));
        assert!(quarter_bounds(2024, 0).is_err());
        assert!(quarter_bounds(2024, 5).is_err());
        assert_eq!(quarter_of(date(2024, 8, 15)), 3);
    }

    #[test]
    fn vat_breakdown_groups_by_rate() {
        let items = vec![
            item(21, dec!(100.00), dec!(21.00)),
            item(9, dec!(50.00), dec!(4.50)),
            item(21, dec!(10.00), dec!(2.10)),
        ];
        let breakdown = vat_breakdown(&items);
        assert_eq!(breakdown.len(), 2);
        assert_eq!(breakdown[0].rate, 9);
        assert_eq!(breakdown[1].rate, 21);
        assert_eq!(breakdown[1].base, dec!(110.00));
        assert_eq!(breakdown[1].vat, dec!(23.10));
    }

    #[test]
    fn invoices_csv_has_bom_header_and_rows() {
        let client_id = Uuid::new_v4();
        let bytes = invoices_csv(&[invoice("SF000001", client_id)], &HashMap::new()).unwrap();
        assert!(bytes.starts_with(UTF8_BOM));

        let text = String::from_utf8(bytes[UTF8_BOM.len()..].to_vec()).unwrap();
        let mut lines = text.lines();
        assert!(lines.next().unwrap().starts_with("Sąskaitos Nr.,Data,Terminas"));
        assert_eq!(
            lines.next().unwrap(),
            "SF000001,2024-02-10,2024-02-24,,100.00,21.00,121.00,sent,"
        );
        assert!(lines.next().is_none());
    }

    #[test]
    fn vat_csv_is_semicolon_separated_per_line_item() {
        let client_id = Uuid::new_v4();
        let rows = vec![(
            invoice("SF000007", client_id),
            vec![item(21, dec!(100.00), dec!(21.00)), item(0, dec!(5.00), dec!(0.00))],
        )];
        let bytes = vat_csv(&rows, &HashMap::new()).unwrap();
        let text = String::from_utf8(bytes[UTF8_BOM.len()..].to_vec()).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("Dokumento tipas;Dokumento numeris"));
        assert_eq!(lines[1], "SF;SF000007;2024-02-10;;;;100.00;21.00;21");
        assert_eq!(lines[2], "SF;SF000007;2024-02-10;;;;5.00;0.00;0");
    }
}
