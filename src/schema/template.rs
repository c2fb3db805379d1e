//! Printable documents: quotes, work orders and PDV receipts

use chrono::{DateTime, Local, Utc};
use rust_embed::Embed;
use serde::Serialize;
use tera::Tera;
use thiserror::Error;

use crate::core::money::format_brl;
use crate::core::totals::Totals;
use crate::entities::{
    Customer, Employee, LineItems, OrderStatus, PaymentMethod, Quote, QuoteStatus, Sale,
    SaleStatus, Vehicle, WorkOrder,
};

#[derive(Embed)]
#[folder = "templates/"]
struct EmbeddedTemplates;

const QUOTE_TEMPLATE: &str = "quote.txt.tera";
const ORDER_TEMPLATE: &str = "work_order.txt.tera";
const RECEIPT_TEMPLATE: &str = "receipt.txt.tera";

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("template error: {0}")]
    RenderError(String),

    #[error("template not found: {0}")]
    Missing(&'static str),
}

/// One printed line with money already formatted
#[derive(Debug, Serialize)]
struct LineView {
    id: u32,
    description: String,
    quantity: u32,
    unit: String,
    total: String,
}

#[derive(Debug, Serialize)]
struct TotalsView {
    service_subtotal: String,
    part_subtotal: String,
    gross_total: String,
    discount: String,
    net_total: String,
}

impl From<&Totals> for TotalsView {
    fn from(t: &Totals) -> Self {
        Self {
            service_subtotal: format_brl(t.service_subtotal),
            part_subtotal: format_brl(t.part_subtotal),
            gross_total: format_brl(t.gross_total),
            discount: format_brl(t.discount),
            net_total: format_brl(t.net_total),
        }
    }
}

fn service_views(items: &LineItems) -> Vec<LineView> {
    items
        .services
        .iter()
        .map(|s| LineView {
            id: s.id,
            description: s.description.clone(),
            quantity: 1,
            unit: format_brl(s.value),
            total: format_brl(s.value),
        })
        .collect()
}

fn part_views(parts: &[crate::entities::PartLine]) -> Vec<LineView> {
    parts
        .iter()
        .map(|p| LineView {
            id: p.id,
            description: p.name.clone(),
            quantity: p.quantity,
            unit: format_brl(p.unit_price),
            total: format_brl(p.line_total()),
        })
        .collect()
}

fn local_date(at: DateTime<Utc>) -> String {
    at.with_timezone(&Local).format("%d/%m/%Y").to_string()
}

fn quote_status_label(status: QuoteStatus) -> &'static str {
    match status {
        QuoteStatus::Pending => "pendente",
        QuoteStatus::Approved => "aprovado",
        QuoteStatus::Rejected => "recusado",
        QuoteStatus::ConvertedToOrder => "convertido em OS",
    }
}

fn order_status_label(status: OrderStatus) -> &'static str {
    match status {
        OrderStatus::Open => "aberta",
        OrderStatus::InProgress => "em andamento",
        OrderStatus::WaitingParts => "aguardando peças",
        OrderStatus::Completed => "concluída",
        OrderStatus::Delivered => "entregue",
        OrderStatus::Cancelled => "cancelada",
    }
}

fn payment_label(method: PaymentMethod) -> &'static str {
    match method {
        PaymentMethod::Cash => "dinheiro",
        PaymentMethod::Debit => "débito",
        PaymentMethod::Credit => "crédito",
        PaymentMethod::Pix => "pix",
    }
}

pub struct DocumentRenderer {
    tera: Tera,
    shop_name: String,
}

impl DocumentRenderer {
    pub fn new(shop_name: impl Into<String>) -> Result<Self, TemplateError> {
        let mut tera = Tera::default();
        for file in EmbeddedTemplates::iter() {
            let name = file.as_ref();
            if let Some(content) = EmbeddedTemplates::get(name) {
                let text = std::str::from_utf8(&content.data)
                    .map_err(|e| TemplateError::RenderError(format!("{}: {}", name, e)))?;
                tera.add_raw_template(name, text)
                    .map_err(|e| TemplateError::RenderError(e.to_string()))?;
            }
        }
        for required in [QUOTE_TEMPLATE, ORDER_TEMPLATE, RECEIPT_TEMPLATE] {
            if !tera.get_template_names().any(|n| n == required) {
                return Err(TemplateError::Missing(required));
            }
        }
        Ok(Self {
            tera,
            shop_name: shop_name.into(),
        })
    }

    fn base_context(&self) -> tera::Context {
        let mut context = tera::Context::new();
        context.insert("shop", &self.shop_name);
        context
    }

    fn render(&self, template: &str, context: &tera::Context) -> Result<String, TemplateError> {
        self.tera
            .render(template, context)
            .map_err(|e| TemplateError::RenderError(e.to_string()))
    }

    pub fn render_quote(
        &self,
        quote: &Quote,
        customer: &Customer,
        vehicle: &Vehicle,
        totals: &Totals,
    ) -> Result<String, TemplateError> {
        let mut context = self.base_context();
        context.insert("number", &quote.number);
        context.insert("date", &local_date(quote.created));
        context.insert("valid_until", &quote.valid_until.format("%d/%m/%Y").to_string());
        context.insert("status", quote_status_label(quote.status));
        context.insert("customer", &customer.name);
        context.insert("document", &customer.document);
        context.insert("vehicle", &format!("{} {}", vehicle.plate, vehicle.description()));
        context.insert("services", &service_views(&quote.items));
        context.insert("parts", &part_views(&quote.items.parts));
        context.insert("notes", &quote.notes);
        context.extend(tera::Context::from_serialize(TotalsView::from(totals))
            .map_err(|e| TemplateError::RenderError(e.to_string()))?);
        self.render(QUOTE_TEMPLATE, &context)
    }

    pub fn render_work_order(
        &self,
        order: &WorkOrder,
        customer: &Customer,
        vehicle: &Vehicle,
        mechanic: Option<&Employee>,
        quote_number: Option<u32>,
        totals: &Totals,
    ) -> Result<String, TemplateError> {
        let mut context = self.base_context();
        context.insert("number", &order.number);
        context.insert("date", &local_date(order.created));
        context.insert("status", order_status_label(order.status));
        context.insert("customer", &customer.name);
        context.insert("document", &customer.document);
        context.insert("vehicle", &format!("{} {}", vehicle.plate, vehicle.description()));
        context.insert("mileage", &order.mileage);
        context.insert("mechanic", &mechanic.map(|m| m.name.clone()));
        context.insert("complaint", &order.complaint);
        context.insert("quote_number", &quote_number);
        context.insert("services", &service_views(&order.items));
        context.insert("parts", &part_views(&order.items.parts));
        context.extend(tera::Context::from_serialize(TotalsView::from(totals))
            .map_err(|e| TemplateError::RenderError(e.to_string()))?);
        self.render(ORDER_TEMPLATE, &context)
    }

    pub fn render_receipt(
        &self,
        sale: &Sale,
        customer: Option<&Customer>,
    ) -> Result<String, TemplateError> {
        let totals = sale.totals();
        let mut context = self.base_context();
        context.insert("number", &sale.number);
        context.insert("date", &local_date(sale.created));
        context.insert("customer", &customer.map(|c| c.name.clone()));
        context.insert("parts", &part_views(&sale.items));
        context.insert("payment", payment_label(sale.payment));
        context.insert("received", &sale.amount_received.map(format_brl));
        context.insert("change", &sale.change().map(format_brl));
        context.insert("cancelled", &(sale.status == SaleStatus::Cancelled));
        context.extend(tera::Context::from_serialize(TotalsView::from(&totals))
            .map_err(|e| TemplateError::RenderError(e.to_string()))?);
        self.render(RECEIPT_TEMPLATE, &context)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::identity::{EntityId, EntityPrefix};
    use crate::entities::{PartInput, PartLine, ServiceInput};
    use chrono::{NaiveDate, TimeZone};

    fn noon() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 5, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_receipt() {
        let renderer = DocumentRenderer::new("Oficina Teste").unwrap();
        let lines = vec![
            PartLine {
                id: 1,
                catalog: None,
                code: None,
                name: "Lâmpada H4".to_string(),
                quantity: 2,
                unit_price: 17.5,
            },
            PartLine {
                id: 2,
                catalog: None,
                code: None,
                name: "Palheta".to_string(),
                quantity: 1,
                unit_price: 30.0,
            },
        ];
        let mut sale = Sale::new(3, lines, PaymentMethod::Cash, "t".to_string());
        sale.discount = 5.0;
        sale.amount_received = Some(100.0);
        sale.created = noon();

        let out = renderer.render_receipt(&sale, None).unwrap();
        insta::assert_snapshot!(out.trim_end(), @r"
        Oficina Teste
        CUPOM NÃO FISCAL - VENDA #3
        05/03/2026
        2 x Lâmpada H4 @ R$ 17,50  R$ 35,00
        1 x Palheta @ R$ 30,00  R$ 30,00
        Subtotal: R$ 65,00
        Desconto: R$ 5,00
        TOTAL: R$ 60,00
        Pagamento: dinheiro
        Recebido: R$ 100,00  Troco: R$ 40,00
        ");
    }

    #[test]
    fn test_quote_document() {
        let renderer = DocumentRenderer::new("Auto Center").unwrap();
        let customer = Customer::new(
            "Maria Souza".to_string(),
            "123.456.789-09".to_string(),
            "11987654321".to_string(),
            "t".to_string(),
        );
        let vehicle = Vehicle::new(
            customer.id.clone(),
            "ABC1D23",
            "Fiat".to_string(),
            "Uno".to_string(),
            2015,
            "t".to_string(),
        );
        let mut items = LineItems::new();
        items
            .add_service(ServiceInput {
                description: "Alinhamento".to_string(),
                value: 150.0,
                ..Default::default()
            })
            .unwrap();
        items
            .add_part(PartInput {
                name: "Pastilha".to_string(),
                quantity: 4,
                unit_price: 45.0,
                ..Default::default()
            })
            .unwrap();
        items.set_discount(20.0).unwrap();

        let mut quote = Quote::new(
            7,
            customer.id.clone(),
            vehicle.id.clone(),
            items,
            NaiveDate::from_ymd_opt(2026, 3, 20).unwrap(),
            "t".to_string(),
        );
        quote.created = noon();
        let totals = quote.items.totals(Default::default());

        let out = renderer.render_quote(&quote, &customer, &vehicle, &totals).unwrap();
        insta::assert_snapshot!(out.trim_end(), @r"
        Auto Center
        ORÇAMENTO #7
        Data: 05/03/2026  Validade: 20/03/2026  Situação: pendente
        Cliente: Maria Souza (123.456.789-09)
        Veículo: ABC1D23 Fiat Uno 2015
        Serviços:
        1. Alinhamento  R$ 150,00
        Peças:
        2. 4 x Pastilha @ R$ 45,00  R$ 180,00
        Subtotal serviços: R$ 150,00
        Subtotal peças: R$ 180,00
        Bruto: R$ 330,00
        Desconto: R$ 20,00
        TOTAL: R$ 310,00
        ");
    }

    #[test]
    fn test_work_order_mentions_mechanic_and_origin() {
        let renderer = DocumentRenderer::new("Auto Center").unwrap();
        let customer = Customer::new(
            "Maria Souza".to_string(),
            "12345678909".to_string(),
            "11987654321".to_string(),
            "t".to_string(),
        );
        let vehicle = Vehicle::new(
            customer.id.clone(),
            "ABC1D23",
            "Fiat".to_string(),
            "Uno".to_string(),
            2015,
            "t".to_string(),
        );
        let mechanic = Employee::new(
            "Carlos Pereira".to_string(),
            Default::default(),
            "98765432100".to_string(),
            "11912345678".to_string(),
            "t".to_string(),
        );
        let mut items = LineItems::new();
        items
            .add_service(ServiceInput {
                description: "Troca de óleo".to_string(),
                value: 80.0,
                ..Default::default()
            })
            .unwrap();
        let mut order = WorkOrder::new(2, customer.id.clone(), vehicle.id.clone(), items, "t".to_string());
        order.quote = Some(EntityId::new(EntityPrefix::Orc));
        order.mileage = Some(45200);

        let totals = order.items.totals(Default::default());
        let out = renderer
            .render_work_order(&order, &customer, &vehicle, Some(&mechanic), Some(7), &totals)
            .unwrap();

        assert!(out.contains("ORDEM DE SERVIÇO #2"));
        assert!(out.contains("Km: 45200"));
        assert!(out.contains("Mecânico: Carlos Pereira"));
        assert!(out.contains("Orçamento de origem: #7"));
        assert!(out.contains("TOTAL: R$ 80,00"));
        assert!(!out.contains("Reclamação"));
    }
}
