//! Shop operations over the record repositories
//!
//! `Shop` is the only place that touches more than one record type at a
//! time: ownership checks, stock movements, quote conversion and
//! scheduling conflicts all live here. The CLI resolves short IDs and
//! formats output; everything else goes through these methods.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};
use miette::Diagnostic;
use std::collections::HashMap;
use thiserror::Error;

use crate::core::config::Config;
use crate::core::entity::Entity;
use crate::core::identity::{EntityId, EntityPrefix};
use crate::core::project::Project;
use crate::core::repository::{MemoryRepository, Repository, RepositoryError, YamlRepository};
use crate::core::totals::{DiscountPolicy, Totals};
use crate::core::workflow::{self, WorkflowError};
use crate::entities::{
    Appointment, AppointmentStatus, ChecklistTemplate, Customer, Employee, Inspection, LineItems,
    OrderStatus, PartInput, PartItem, PaymentMethod, Quote, QuoteStatus, Sale, SaleStatus,
    ServiceInput, ServiceItem, Vehicle, WorkOrder,
};
use crate::schema::rules::{self, ValidationErrors};

#[derive(Debug, Error, Diagnostic)]
pub enum ShopError {
    #[error("{kind} not found: {reference}")]
    #[diagnostic(
        code(oficina::not_found),
        help("use the full ID, a short ID like ORC@1, or a unique part of the ID")
    )]
    NotFound {
        kind: &'static str,
        reference: String,
    },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Validation(#[from] ValidationErrors),

    #[error(transparent)]
    #[diagnostic(code(oficina::workflow))]
    Workflow(#[from] WorkflowError),

    #[error(transparent)]
    #[diagnostic(code(oficina::storage))]
    Repository(#[from] RepositoryError),

    #[error("not enough stock for {part}: {available} available, {requested} requested")]
    #[diagnostic(code(oficina::stock))]
    InsufficientStock {
        part: String,
        available: u32,
        requested: u32,
    },

    #[error("{0}")]
    #[diagnostic(code(oficina::conflict))]
    Conflict(String),
}

pub type Result<T> = std::result::Result<T, ShopError>;

/// Values the shop needs from configuration
#[derive(Debug, Clone)]
pub struct ShopSettings {
    pub author: String,
    pub quote_validity_days: u32,
    /// Policy for quotes and work orders; sales always clamp
    pub document_policy: DiscountPolicy,
}

impl Default for ShopSettings {
    fn default() -> Self {
        Self {
            author: "oficina".to_string(),
            quote_validity_days: 15,
            document_policy: DiscountPolicy::Unclamped,
        }
    }
}

impl ShopSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            author: config.author(),
            quote_validity_days: config.quote_validity_days(),
            document_policy: config.document_discount_policy(),
        }
    }
}

/// A quote or work order being created
#[derive(Debug, Clone, Default)]
pub struct DocumentDraft {
    pub customer: Option<EntityId>,
    pub vehicle: Option<EntityId>,
    pub items: LineItems,
    pub notes: Option<String>,
    /// Work orders only
    pub complaint: Option<String>,
    pub mileage: Option<u32>,
    pub mechanic: Option<EntityId>,
}

/// One PDV line: catalog part reference and quantity
#[derive(Debug, Clone)]
pub struct SaleLine {
    pub part: String,
    pub quantity: i64,
}

#[derive(Debug, Clone, Default)]
pub struct SaleDraft {
    pub customer: Option<EntityId>,
    pub lines: Vec<SaleLine>,
    pub discount: f64,
    pub payment: PaymentMethod,
    pub amount_received: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct AppointmentDraft {
    pub customer: EntityId,
    pub vehicle: EntityId,
    pub mechanic: Option<EntityId>,
    pub starts_at: NaiveDateTime,
    pub duration_minutes: u32,
    pub service: String,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct CatalogMatches {
    pub services: Vec<ServiceItem>,
    pub parts: Vec<PartItem>,
}

/// What a customer sees on the portal
#[derive(Debug, Clone)]
pub struct PortalView {
    pub customer: Customer,
    pub vehicles: Vec<Vehicle>,
    pub quotes: Vec<(Quote, Totals)>,
    pub orders: Vec<(WorkOrder, Totals)>,
    pub appointments: Vec<Appointment>,
}

#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct Dashboard {
    pub customers: usize,
    pub vehicles: usize,
    pub active_employees: usize,
    pub pending_quotes: usize,
    pub pending_quote_value: f64,
    pub orders_by_status: Vec<(String, usize)>,
    pub appointments_today: usize,
    pub sales_today: usize,
    pub sales_today_total: f64,
    pub low_stock_parts: usize,
}

pub struct Shop {
    pub customers: Box<dyn Repository<Customer>>,
    pub vehicles: Box<dyn Repository<Vehicle>>,
    pub employees: Box<dyn Repository<Employee>>,
    pub services: Box<dyn Repository<ServiceItem>>,
    pub parts: Box<dyn Repository<PartItem>>,
    pub quotes: Box<dyn Repository<Quote>>,
    pub orders: Box<dyn Repository<WorkOrder>>,
    pub sales: Box<dyn Repository<Sale>>,
    pub appointments: Box<dyn Repository<Appointment>>,
    pub templates: Box<dyn Repository<ChecklistTemplate>>,
    pub inspections: Box<dyn Repository<Inspection>>,
    settings: ShopSettings,
}

fn yaml<T: Entity + 'static>(project: &Project) -> Box<dyn Repository<T>> {
    Box::new(YamlRepository::<T>::new(project.entity_dir(T::PREFIX)))
}

fn memory<T: Entity + 'static>() -> Box<dyn Repository<T>> {
    Box::new(MemoryRepository::<T>::new())
}

fn require<T: Entity>(repo: &dyn Repository<T>, id: &EntityId) -> Result<T> {
    repo.find_by_id(id)?.ok_or_else(|| ShopError::NotFound {
        kind: T::PREFIX.label(),
        reference: id.to_string(),
    })
}

fn lookup<T: Entity>(repo: &dyn Repository<T>, reference: &str) -> Result<T> {
    repo.find(reference)?.ok_or_else(|| ShopError::NotFound {
        kind: T::PREFIX.label(),
        reference: reference.to_string(),
    })
}

impl Shop {
    /// File-backed shop rooted at a project
    pub fn open(project: &Project, settings: ShopSettings) -> Self {
        Self {
            customers: yaml(project),
            vehicles: yaml(project),
            employees: yaml(project),
            services: yaml(project),
            parts: yaml(project),
            quotes: yaml(project),
            orders: yaml(project),
            sales: yaml(project),
            appointments: yaml(project),
            templates: yaml(project),
            inspections: yaml(project),
            settings,
        }
    }

    pub fn in_memory(settings: ShopSettings) -> Self {
        Self {
            customers: memory(),
            vehicles: memory(),
            employees: memory(),
            services: memory(),
            parts: memory(),
            quotes: memory(),
            orders: memory(),
            sales: memory(),
            appointments: memory(),
            templates: memory(),
            inspections: memory(),
            settings,
        }
    }

    pub fn settings(&self) -> &ShopSettings {
        &self.settings
    }

    /// Totals of a quote or work order body under the configured policy
    pub fn document_totals(&self, items: &LineItems) -> Totals {
        items.totals(self.settings.document_policy)
    }

    // ----- registries -----

    pub fn register_customer(&mut self, customer: Customer) -> Result<Customer> {
        customer.validate().into_result()?;
        let digits = customer.document_digits();
        if let Some(existing) = self
            .customers
            .list()?
            .into_iter()
            .find(|c| c.document_digits() == digits)
        {
            return Err(ShopError::Conflict(format!(
                "a customer with document {} already exists: {} ({})",
                customer.document, existing.name, existing.id
            )));
        }
        self.customers.insert(customer.clone())?;
        tracing::info!(id = %customer.id, name = %customer.name, "customer registered");
        Ok(customer)
    }

    pub fn update_customer(&mut self, customer: Customer) -> Result<Customer> {
        customer.validate().into_result()?;
        self.customers.update(customer.clone())?;
        Ok(customer)
    }

    /// Find by ID, short-ID-resolved reference, or CPF/CNPJ
    pub fn find_customer(&self, reference: &str) -> Result<Option<Customer>> {
        if let Some(c) = self.customers.find(reference)? {
            return Ok(Some(c));
        }
        let digits = rules::digits_only(reference);
        if digits.len() == 11 || digits.len() == 14 {
            return Ok(self
                .customers
                .list()?
                .into_iter()
                .find(|c| c.document_digits() == digits));
        }
        Ok(None)
    }

    pub fn require_customer(&self, reference: &str) -> Result<Customer> {
        self.find_customer(reference)?
            .ok_or_else(|| ShopError::NotFound {
                kind: "customer",
                reference: reference.to_string(),
            })
    }

    pub fn register_vehicle(&mut self, vehicle: Vehicle) -> Result<Vehicle> {
        vehicle.validate().into_result()?;
        let owner = require(self.customers.as_ref(), &vehicle.customer)?;
        if let Some(existing) = self
            .vehicles
            .list()?
            .into_iter()
            .find(|v| v.plate == vehicle.plate)
        {
            return Err(ShopError::Conflict(format!(
                "plate {} is already registered: {}",
                vehicle.plate, existing.id
            )));
        }
        self.vehicles.insert(vehicle.clone())?;
        tracing::info!(id = %vehicle.id, plate = %vehicle.plate, owner = %owner.id, "vehicle registered");
        Ok(vehicle)
    }

    pub fn update_vehicle(&mut self, vehicle: Vehicle) -> Result<Vehicle> {
        vehicle.validate().into_result()?;
        self.vehicles.update(vehicle.clone())?;
        Ok(vehicle)
    }

    /// Find by ID or plate (any case, dash optional)
    pub fn find_vehicle(&self, reference: &str) -> Result<Option<Vehicle>> {
        let plate = rules::normalize_plate(reference);
        if plate.len() == 7 {
            if let Some(v) = self.vehicles.list()?.into_iter().find(|v| v.plate == plate) {
                return Ok(Some(v));
            }
        }
        Ok(self.vehicles.find(reference)?)
    }

    pub fn require_vehicle(&self, reference: &str) -> Result<Vehicle> {
        self.find_vehicle(reference)?
            .ok_or_else(|| ShopError::NotFound {
                kind: "vehicle",
                reference: reference.to_string(),
            })
    }

    pub fn vehicles_of(&self, customer: &EntityId) -> Result<Vec<Vehicle>> {
        Ok(self
            .vehicles
            .list()?
            .into_iter()
            .filter(|v| &v.customer == customer)
            .collect())
    }

    pub fn register_employee(&mut self, employee: Employee) -> Result<Employee> {
        employee.validate().into_result()?;
        self.employees.insert(employee.clone())?;
        tracing::info!(id = %employee.id, role = %employee.role, "employee registered");
        Ok(employee)
    }

    pub fn update_employee(&mut self, employee: Employee) -> Result<Employee> {
        employee.validate().into_result()?;
        self.employees.update(employee.clone())?;
        Ok(employee)
    }

    pub fn find_employee(&self, reference: &str) -> Result<Option<Employee>> {
        Ok(self.employees.find(reference)?)
    }

    pub fn require_employee(&self, reference: &str) -> Result<Employee> {
        lookup(self.employees.as_ref(), reference)
    }

    pub fn deactivate_customer(&mut self, id: &EntityId) -> Result<Customer> {
        let mut customer = require(self.customers.as_ref(), id)?;
        customer.active = false;
        self.customers.update(customer.clone())?;
        tracing::info!(id = %id, "customer deactivated");
        Ok(customer)
    }

    pub fn deactivate_employee(&mut self, id: &EntityId) -> Result<Employee> {
        let mut employee = require(self.employees.as_ref(), id)?;
        employee.active = false;
        self.employees.update(employee.clone())?;
        tracing::info!(id = %id, "employee deactivated");
        Ok(employee)
    }

    // ----- catalog -----

    pub fn add_service_item(&mut self, item: ServiceItem) -> Result<ServiceItem> {
        item.validate().into_result()?;
        self.services.insert(item.clone())?;
        tracing::info!(id = %item.id, name = %item.name, "catalog service added");
        Ok(item)
    }

    pub fn update_service_item(&mut self, item: ServiceItem) -> Result<ServiceItem> {
        item.validate().into_result()?;
        self.services.update(item.clone())?;
        Ok(item)
    }

    pub fn add_part_item(&mut self, item: PartItem) -> Result<PartItem> {
        item.validate().into_result()?;
        if self
            .parts
            .list()?
            .iter()
            .any(|p| p.code.eq_ignore_ascii_case(&item.code))
        {
            return Err(ShopError::Conflict(format!(
                "part code {} is already in the catalog",
                item.code
            )));
        }
        self.parts.insert(item.clone())?;
        tracing::info!(id = %item.id, code = %item.code, "catalog part added");
        Ok(item)
    }

    pub fn update_part_item(&mut self, item: PartItem) -> Result<PartItem> {
        item.validate().into_result()?;
        self.parts.update(item.clone())?;
        Ok(item)
    }

    /// Find by ID, code or exact name (case-insensitive)
    pub fn find_service(&self, reference: &str) -> Result<Option<ServiceItem>> {
        let all = self.services.list()?;
        if let Some(s) = all.iter().find(|s| {
            s.code
                .as_deref()
                .is_some_and(|c| c.eq_ignore_ascii_case(reference))
                || s.name.to_lowercase() == reference.to_lowercase()
        }) {
            return Ok(Some(s.clone()));
        }
        Ok(self.services.find(reference)?)
    }

    /// Find by ID or part code
    pub fn find_part(&self, reference: &str) -> Result<Option<PartItem>> {
        if let Some(p) = self
            .parts
            .list()?
            .into_iter()
            .find(|p| p.code.eq_ignore_ascii_case(reference))
        {
            return Ok(Some(p));
        }
        Ok(self.parts.find(reference)?)
    }

    pub fn search_catalog(&self, term: &str) -> Result<CatalogMatches> {
        Ok(CatalogMatches {
            services: self
                .services
                .list()?
                .into_iter()
                .filter(|s| s.matches(term))
                .collect(),
            parts: self
                .parts
                .list()?
                .into_iter()
                .filter(|p| p.matches(term))
                .collect(),
        })
    }

    /// Service line priced from the catalog unless a value is given
    pub fn service_line_from_catalog(
        &self,
        reference: &str,
        value: Option<f64>,
    ) -> Result<ServiceInput> {
        let item = self
            .find_service(reference)?
            .ok_or_else(|| ShopError::NotFound {
                kind: "service",
                reference: reference.to_string(),
            })?;
        Ok(ServiceInput {
            catalog: Some(item.id.clone()),
            description: item.name.clone(),
            value: value.unwrap_or(item.price),
        })
    }

    pub fn part_line_from_catalog(
        &self,
        reference: &str,
        quantity: i64,
        unit_price: Option<f64>,
    ) -> Result<PartInput> {
        let item = self
            .find_part(reference)?
            .ok_or_else(|| ShopError::NotFound {
                kind: "part",
                reference: reference.to_string(),
            })?;
        Ok(PartInput {
            catalog: Some(item.id.clone()),
            code: Some(item.code.clone()),
            name: item.name.clone(),
            quantity,
            unit_price: unit_price.unwrap_or(item.price),
        })
    }

    // ----- references and deletion -----

    /// Records that point at `id`
    pub fn references_to(&self, id: &EntityId) -> Result<Vec<EntityId>> {
        let mut refs = Vec::new();
        match id.prefix() {
            EntityPrefix::Cli => {
                refs.extend(self.vehicles_of(id)?.into_iter().map(|v| v.id));
                refs.extend(self.quotes.list()?.into_iter().filter(|q| &q.customer == id).map(|q| q.id));
                refs.extend(self.orders.list()?.into_iter().filter(|o| &o.customer == id).map(|o| o.id));
                refs.extend(
                    self.sales
                        .list()?
                        .into_iter()
                        .filter(|s| s.customer.as_ref() == Some(id))
                        .map(|s| s.id),
                );
                refs.extend(
                    self.appointments
                        .list()?
                        .into_iter()
                        .filter(|a| &a.customer == id)
                        .map(|a| a.id),
                );
            }
            EntityPrefix::Vei => {
                refs.extend(self.quotes.list()?.into_iter().filter(|q| &q.vehicle == id).map(|q| q.id));
                refs.extend(self.orders.list()?.into_iter().filter(|o| &o.vehicle == id).map(|o| o.id));
                refs.extend(
                    self.appointments
                        .list()?
                        .into_iter()
                        .filter(|a| &a.vehicle == id)
                        .map(|a| a.id),
                );
                refs.extend(
                    self.inspections
                        .list()?
                        .into_iter()
                        .filter(|i| &i.vehicle == id)
                        .map(|i| i.id),
                );
            }
            EntityPrefix::Fun => {
                refs.extend(
                    self.orders
                        .list()?
                        .into_iter()
                        .filter(|o| o.mechanic.as_ref() == Some(id))
                        .map(|o| o.id),
                );
                refs.extend(
                    self.appointments
                        .list()?
                        .into_iter()
                        .filter(|a| a.mechanic.as_ref() == Some(id))
                        .map(|a| a.id),
                );
            }
            EntityPrefix::Chk => {
                refs.extend(
                    self.inspections
                        .list()?
                        .into_iter()
                        .filter(|i| &i.template == id)
                        .map(|i| i.id),
                );
            }
            _ => {}
        }
        Ok(refs)
    }

    /// Delete a registry or catalog record that nothing references
    pub fn delete(&mut self, id: &EntityId) -> Result<()> {
        let refs = self.references_to(id)?;
        if !refs.is_empty() {
            let listed: Vec<String> = refs.iter().take(5).map(|r| r.to_string()).collect();
            return Err(ShopError::Conflict(format!(
                "{} is referenced by {} record(s): {}{}; deactivate it instead",
                id,
                refs.len(),
                listed.join(", "),
                if refs.len() > 5 { ", ..." } else { "" }
            )));
        }

        match id.prefix() {
            EntityPrefix::Cli => self.customers.delete(id)?,
            EntityPrefix::Vei => self.vehicles.delete(id)?,
            EntityPrefix::Fun => self.employees.delete(id)?,
            EntityPrefix::Svc => self.services.delete(id)?,
            EntityPrefix::Pec => self.parts.delete(id)?,
            EntityPrefix::Chk => self.templates.delete(id)?,
            other => {
                return Err(ShopError::Conflict(format!(
                    "{} records cannot be deleted; cancel or reject them instead",
                    other.label()
                )))
            }
        }
        tracing::info!(id = %id, "record deleted");
        Ok(())
    }

    // ----- numbering -----

    /// Next human-facing number for quotes, work orders and sales
    pub fn next_number(&self, prefix: EntityPrefix) -> Result<u32> {
        let max = match prefix {
            EntityPrefix::Orc => self.quotes.list()?.iter().map(|q| q.number).max(),
            EntityPrefix::Os => self.orders.list()?.iter().map(|o| o.number).max(),
            EntityPrefix::Vnd => self.sales.list()?.iter().map(|s| s.number).max(),
            _ => None,
        };
        Ok(max.unwrap_or(0) + 1)
    }

    // ----- quotes -----

    /// Customer and vehicle exist and the vehicle belongs to the customer
    fn check_owner(&self, customer: &EntityId, vehicle: &EntityId) -> Result<(Customer, Vehicle)> {
        let customer = require(self.customers.as_ref(), customer)?;
        let vehicle = require(self.vehicles.as_ref(), vehicle)?;
        if vehicle.customer != customer.id {
            return Err(ShopError::Conflict(format!(
                "vehicle {} does not belong to {}",
                vehicle.plate, customer.name
            )));
        }
        Ok((customer, vehicle))
    }

    fn draft_parties(draft: &DocumentDraft) -> Result<(EntityId, EntityId)> {
        let mut errors = ValidationErrors::new();
        if draft.customer.is_none() {
            errors.push("customer", "customer is required");
        }
        if draft.vehicle.is_none() {
            errors.push("vehicle", "vehicle is required");
        }
        for e in draft.items.validate().errors() {
            errors.push(e.field.clone(), e.message.clone());
        }
        match (&draft.customer, &draft.vehicle) {
            (Some(c), Some(v)) if errors.is_empty() => Ok((c.clone(), v.clone())),
            _ => Err(ShopError::Validation(errors)),
        }
    }

    /// Submit a new quote; it starts pending and valid for the configured days
    pub fn create_quote(&mut self, draft: DocumentDraft, today: NaiveDate) -> Result<Quote> {
        let (customer, vehicle) = Self::draft_parties(&draft)?;
        self.check_owner(&customer, &vehicle)?;

        let valid_until = today + Duration::days(i64::from(self.settings.quote_validity_days));
        let mut quote = Quote::new(
            self.next_number(EntityPrefix::Orc)?,
            customer,
            vehicle,
            draft.items,
            valid_until,
            self.settings.author.clone(),
        );
        quote.notes = draft.notes;
        quote.validate().into_result()?;

        self.quotes.insert(quote.clone())?;
        tracing::info!(id = %quote.id, number = quote.number, "quote created");
        Ok(quote)
    }

    /// Apply an edit to a pending quote's line items and save it
    pub fn edit_quote<F>(&mut self, id: &EntityId, edit: F) -> Result<Quote>
    where
        F: FnOnce(&mut LineItems) -> Result<()>,
    {
        let mut quote = require(self.quotes.as_ref(), id)?;
        workflow::ensure_editable(quote.status)?;
        edit(&mut quote.items)?;
        quote.validate().into_result()?;
        self.quotes.update(quote.clone())?;
        tracing::debug!(id = %id, "quote edited");
        Ok(quote)
    }

    /// Save a whole quote (e.g. after editing the file) if still editable.
    ///
    /// Status changes go through approve, reject and renew; numbering,
    /// validity and decision fields keep their stored values.
    pub fn save_quote(&mut self, mut quote: Quote) -> Result<Quote> {
        let stored = require(self.quotes.as_ref(), &quote.id)?;
        workflow::ensure_editable(stored.status)?;
        if quote.status != stored.status {
            return Err(ShopError::Conflict(format!(
                "status cannot be changed by editing (quote is {}); use 'oficina quote approve', 'reject' or 'renew'",
                stored.status
            )));
        }
        self.check_owner(&quote.customer, &quote.vehicle)?;

        quote.number = stored.number;
        quote.valid_until = stored.valid_until;
        quote.decided_at = stored.decided_at;
        quote.decided_by = stored.decided_by;
        quote.rejection_reason = stored.rejection_reason;
        quote.work_order = stored.work_order;
        quote.created = stored.created;
        quote.author = stored.author;
        quote.validate().into_result()?;
        self.quotes.update(quote.clone())?;
        Ok(quote)
    }

    pub fn approve_quote(&mut self, id: &EntityId, by: &str, today: NaiveDate) -> Result<Quote> {
        let mut quote = require(self.quotes.as_ref(), id)?;
        if quote.status == QuoteStatus::Pending && quote.is_expired(today) {
            return Err(WorkflowError::Expired(quote.valid_until).into());
        }
        quote.status = workflow::transition(quote.status, QuoteStatus::Approved)?;
        quote.decided_at = Some(Utc::now());
        quote.decided_by = Some(by.to_string());
        quote.rejection_reason = None;
        self.quotes.update(quote.clone())?;
        tracing::info!(id = %id, by, "quote approved");
        Ok(quote)
    }

    pub fn reject_quote(&mut self, id: &EntityId, by: &str, reason: Option<String>) -> Result<Quote> {
        let mut quote = require(self.quotes.as_ref(), id)?;
        quote.status = workflow::transition(quote.status, QuoteStatus::Rejected)?;
        quote.decided_at = Some(Utc::now());
        quote.decided_by = Some(by.to_string());
        quote.rejection_reason = reason;
        self.quotes.update(quote.clone())?;
        tracing::info!(id = %id, by, "quote rejected");
        Ok(quote)
    }

    /// Extend validity from today; a rejected quote goes back to pending
    pub fn renew_quote(&mut self, id: &EntityId, today: NaiveDate) -> Result<Quote> {
        let mut quote = require(self.quotes.as_ref(), id)?;
        if quote.status != QuoteStatus::Pending {
            quote.status = workflow::transition(quote.status, QuoteStatus::Pending)?;
            quote.decided_at = None;
            quote.decided_by = None;
            quote.rejection_reason = None;
        }
        quote.valid_until = today + Duration::days(i64::from(self.settings.quote_validity_days));
        self.quotes.update(quote.clone())?;
        tracing::info!(id = %id, valid_until = %quote.valid_until, "quote renewed");
        Ok(quote)
    }

    /// Open a work order from an approved quote
    pub fn convert_quote(&mut self, id: &EntityId) -> Result<(Quote, WorkOrder)> {
        let mut quote = require(self.quotes.as_ref(), id)?;
        let next_status = workflow::transition(quote.status, QuoteStatus::ConvertedToOrder)?;

        let mut order = WorkOrder::new(
            self.next_number(EntityPrefix::Os)?,
            quote.customer.clone(),
            quote.vehicle.clone(),
            quote.items.clone(),
            self.settings.author.clone(),
        );
        order.quote = Some(quote.id.clone());
        order.notes = quote.notes.clone();
        order.validate().into_result()?;
        self.orders.insert(order.clone())?;

        quote.status = next_status;
        quote.work_order = Some(order.id.clone());
        self.quotes.update(quote.clone())?;

        tracing::info!(quote = %quote.id, order = %order.id, "quote converted to work order");
        Ok((quote, order))
    }

    // ----- work orders -----

    fn require_worker(&self, id: &EntityId) -> Result<Employee> {
        let employee = require(self.employees.as_ref(), id)?;
        if !employee.can_take_work() {
            return Err(ShopError::Conflict(format!(
                "{} is not an active mechanic or electrician",
                employee.name
            )));
        }
        Ok(employee)
    }

    pub fn create_order(&mut self, draft: DocumentDraft) -> Result<WorkOrder> {
        let (customer, vehicle) = Self::draft_parties(&draft)?;
        let (_, mut stored_vehicle) = self.check_owner(&customer, &vehicle)?;
        if let Some(m) = &draft.mechanic {
            self.require_worker(m)?;
        }

        let mut order = WorkOrder::new(
            self.next_number(EntityPrefix::Os)?,
            customer,
            vehicle,
            draft.items,
            self.settings.author.clone(),
        );
        order.mechanic = draft.mechanic;
        order.complaint = draft.complaint;
        order.mileage = draft.mileage;
        order.notes = draft.notes;
        order.validate().into_result()?;
        self.orders.insert(order.clone())?;

        if let Some(km) = order.mileage {
            if stored_vehicle.mileage.map_or(true, |old| km > old) {
                stored_vehicle.mileage = Some(km);
                self.vehicles.update(stored_vehicle)?;
            }
        }

        tracing::info!(id = %order.id, number = order.number, "work order opened");
        Ok(order)
    }

    pub fn edit_order<F>(&mut self, id: &EntityId, edit: F) -> Result<WorkOrder>
    where
        F: FnOnce(&mut LineItems) -> Result<()>,
    {
        let mut order = require(self.orders.as_ref(), id)?;
        workflow::ensure_editable(order.status)?;
        edit(&mut order.items)?;
        order.validate().into_result()?;
        self.orders.update(order.clone())?;
        tracing::debug!(id = %id, "work order edited");
        Ok(order)
    }

    /// Save a whole work order (e.g. after editing the file) if still editable.
    ///
    /// Status changes go through `transition_order` so the times get stamped.
    pub fn save_order(&mut self, mut order: WorkOrder) -> Result<WorkOrder> {
        let stored = require(self.orders.as_ref(), &order.id)?;
        workflow::ensure_editable(stored.status)?;
        if order.status != stored.status {
            return Err(ShopError::Conflict(format!(
                "status cannot be changed by editing (OS is {}); use 'oficina order status'",
                stored.status
            )));
        }
        self.check_owner(&order.customer, &order.vehicle)?;
        if order.mechanic != stored.mechanic {
            if let Some(m) = &order.mechanic {
                self.require_worker(m)?;
            }
        }

        order.number = stored.number;
        order.quote = stored.quote;
        order.started_at = stored.started_at;
        order.completed_at = stored.completed_at;
        order.delivered_at = stored.delivered_at;
        order.created = stored.created;
        order.author = stored.author;
        order.validate().into_result()?;
        self.orders.update(order.clone())?;
        Ok(order)
    }

    pub fn assign_mechanic(&mut self, order_id: &EntityId, employee: &EntityId) -> Result<WorkOrder> {
        let mut order = require(self.orders.as_ref(), order_id)?;
        workflow::ensure_editable(order.status)?;
        let worker = self.require_worker(employee)?;
        order.mechanic = Some(worker.id.clone());
        self.orders.update(order.clone())?;
        tracing::info!(order = %order_id, mechanic = %worker.id, "mechanic assigned");
        Ok(order)
    }

    pub fn transition_order(
        &mut self,
        id: &EntityId,
        to: OrderStatus,
        now: DateTime<Utc>,
    ) -> Result<WorkOrder> {
        let mut order = require(self.orders.as_ref(), id)?;
        let from = order.status;
        order.status = workflow::transition(from, to)?;
        order.stamp(to, now);
        self.orders.update(order.clone())?;
        tracing::info!(id = %id, %from, %to, "work order status changed");
        Ok(order)
    }

    // ----- PDV -----

    /// Record a counter sale and take the parts out of stock
    pub fn create_sale(&mut self, draft: SaleDraft) -> Result<Sale> {
        if let Some(c) = &draft.customer {
            require(self.customers.as_ref(), c)?;
        }

        let mut lines = LineItems::new();
        let mut catalog: HashMap<EntityId, PartItem> = HashMap::new();
        let mut errors = ValidationErrors::new();

        for (i, line) in draft.lines.iter().enumerate() {
            let part = self
                .find_part(&line.part)?
                .ok_or_else(|| ShopError::NotFound {
                    kind: "part",
                    reference: line.part.clone(),
                })?;
            if !part.active {
                errors.push(format!("items[{}]", i), format!("{} is inactive", part.name));
            }
            let input = PartInput {
                catalog: Some(part.id.clone()),
                code: Some(part.code.clone()),
                name: part.name.clone(),
                quantity: line.quantity,
                unit_price: part.price,
            };
            if let Err(e) = lines.add_part(input) {
                errors.extend_nested(&format!("items[{}]", i), e);
            }
            catalog.insert(part.id.clone(), part);
        }
        errors.into_result()?;

        let mut requested: HashMap<EntityId, u32> = HashMap::new();
        let mut errors = ValidationErrors::new();
        for (i, line) in lines.parts.iter().enumerate() {
            if let Some(id) = &line.catalog {
                let tally = requested.entry(id.clone()).or_default();
                match tally.checked_add(line.quantity) {
                    Some(total) => *tally = total,
                    None => errors.push(
                        format!("items[{}].quantity", i),
                        format!("total quantity of {} is too large", line.name),
                    ),
                }
            }
        }
        errors.into_result()?;
        for (id, qty) in &requested {
            if let Some(part) = catalog.get(id) {
                if part.stock < *qty {
                    return Err(ShopError::InsufficientStock {
                        part: format!("{} {}", part.code, part.name),
                        available: part.stock,
                        requested: *qty,
                    });
                }
            }
        }

        let mut sale = Sale::new(
            self.next_number(EntityPrefix::Vnd)?,
            lines.parts,
            draft.payment,
            self.settings.author.clone(),
        );
        sale.customer = draft.customer;
        sale.discount = draft.discount;
        sale.amount_received = draft.amount_received;
        sale.validate().into_result()?;

        for (id, qty) in requested {
            if let Some(mut part) = catalog.remove(&id) {
                part.stock -= qty;
                if part.is_low_stock() {
                    tracing::warn!(code = %part.code, stock = part.stock, "part at or below minimum stock");
                }
                self.parts.update(part)?;
            }
        }
        self.sales.insert(sale.clone())?;
        tracing::info!(id = %sale.id, number = sale.number, net = sale.totals().net_total, "sale recorded");
        Ok(sale)
    }

    /// Cancel a sale and put its parts back in stock
    pub fn cancel_sale(&mut self, id: &EntityId, now: DateTime<Utc>) -> Result<Sale> {
        let mut sale = require(self.sales.as_ref(), id)?;
        sale.status = workflow::transition(sale.status, SaleStatus::Cancelled)?;
        sale.cancelled_at = Some(now);

        let mut restocked: HashMap<EntityId, PartItem> = HashMap::new();
        for line in &sale.items {
            let Some(part_id) = &line.catalog else {
                continue;
            };
            let part = match restocked.remove(part_id) {
                Some(part) => Some(part),
                None => self.parts.find_by_id(part_id)?,
            };
            let Some(mut part) = part else {
                tracing::warn!(part = %part_id, "cancelled sale refers to a removed part");
                continue;
            };
            part.stock = part.stock.checked_add(line.quantity).ok_or_else(|| {
                ShopError::Conflict(format!(
                    "returning {} x {} would overflow its stock count",
                    line.quantity, part.code
                ))
            })?;
            restocked.insert(part_id.clone(), part);
        }
        for part in restocked.into_values() {
            self.parts.update(part)?;
        }

        self.sales.update(sale.clone())?;
        tracing::info!(id = %id, "sale cancelled");
        Ok(sale)
    }

    // ----- scheduling -----

    pub fn schedule(&mut self, draft: AppointmentDraft) -> Result<Appointment> {
        self.check_owner(&draft.customer, &draft.vehicle)?;
        let mechanic = match &draft.mechanic {
            Some(m) => Some(self.require_worker(m)?),
            None => None,
        };

        let mut appointment = Appointment::new(
            draft.customer,
            draft.vehicle,
            draft.starts_at,
            draft.duration_minutes,
            draft.service.trim().to_string(),
            self.settings.author.clone(),
        );
        appointment.mechanic = draft.mechanic;
        appointment.notes = draft.notes;
        appointment.validate().into_result()?;

        for other in self.appointments.list()? {
            if !other.status.blocks_slot() || !other.overlaps(&appointment) {
                continue;
            }
            if other.vehicle == appointment.vehicle {
                return Err(ShopError::Conflict(format!(
                    "vehicle already booked {} - {} ({})",
                    other.starts_at.format("%d/%m/%Y %H:%M"),
                    other.ends_at().format("%H:%M"),
                    other.id
                )));
            }
            if let (Some(m), Some(om)) = (&mechanic, &other.mechanic) {
                if &m.id == om {
                    return Err(ShopError::Conflict(format!(
                        "{} is already booked {} - {} ({})",
                        m.name,
                        other.starts_at.format("%d/%m/%Y %H:%M"),
                        other.ends_at().format("%H:%M"),
                        other.id
                    )));
                }
            }
        }

        self.appointments.insert(appointment.clone())?;
        tracing::info!(id = %appointment.id, at = %appointment.starts_at, "appointment scheduled");
        Ok(appointment)
    }

    pub fn appointments_on(&self, date: NaiveDate) -> Result<Vec<Appointment>> {
        let mut list: Vec<Appointment> = self
            .appointments
            .list()?
            .into_iter()
            .filter(|a| a.date() == date)
            .collect();
        list.sort_by_key(|a| a.starts_at);
        Ok(list)
    }

    pub fn transition_appointment(
        &mut self,
        id: &EntityId,
        to: AppointmentStatus,
    ) -> Result<Appointment> {
        let mut appointment = require(self.appointments.as_ref(), id)?;
        appointment.status = workflow::transition(appointment.status, to)?;
        self.appointments.update(appointment.clone())?;
        tracing::info!(id = %id, %to, "appointment status changed");
        Ok(appointment)
    }

    // ----- checklists -----

    pub fn create_template(&mut self, template: ChecklistTemplate) -> Result<ChecklistTemplate> {
        template.validate().into_result()?;
        self.templates.insert(template.clone())?;
        tracing::info!(id = %template.id, name = %template.name, "checklist template created");
        Ok(template)
    }

    pub fn record_inspection(&mut self, inspection: Inspection) -> Result<Inspection> {
        let template = require(self.templates.as_ref(), &inspection.template)?;
        require(self.vehicles.as_ref(), &inspection.vehicle)?;
        if let Some(order) = &inspection.work_order {
            let order = require(self.orders.as_ref(), order)?;
            if order.vehicle != inspection.vehicle {
                return Err(ShopError::Conflict(format!(
                    "OS #{} is for a different vehicle",
                    order.number
                )));
            }
        }
        inspection.validate_against(&template).into_result()?;
        self.inspections.insert(inspection.clone())?;
        tracing::info!(id = %inspection.id, template = %template.name, "inspection recorded");
        Ok(inspection)
    }

    // ----- portal -----

    pub fn portal(&self, customer: &EntityId, today: NaiveDate) -> Result<PortalView> {
        let customer = require(self.customers.as_ref(), customer)?;
        let vehicles = self.vehicles_of(&customer.id)?;

        let quotes = self
            .quotes
            .list()?
            .into_iter()
            .filter(|q| q.customer == customer.id)
            .map(|q| {
                let totals = self.document_totals(&q.items);
                (q, totals)
            })
            .collect();
        let orders = self
            .orders
            .list()?
            .into_iter()
            .filter(|o| o.customer == customer.id)
            .map(|o| {
                let totals = self.document_totals(&o.items);
                (o, totals)
            })
            .collect();
        let mut appointments: Vec<Appointment> = self
            .appointments
            .list()?
            .into_iter()
            .filter(|a| a.customer == customer.id && a.status.blocks_slot() && a.date() >= today)
            .collect();
        appointments.sort_by_key(|a| a.starts_at);

        Ok(PortalView {
            customer,
            vehicles,
            quotes,
            orders,
            appointments,
        })
    }

    /// The quote if it belongs to the customer; other customers' quotes
    /// are reported as not found
    fn portal_quote(&self, customer: &EntityId, quote: &EntityId) -> Result<Quote> {
        let found = require(self.quotes.as_ref(), quote)?;
        if &found.customer != customer {
            return Err(ShopError::NotFound {
                kind: "quote",
                reference: quote.to_string(),
            });
        }
        Ok(found)
    }

    pub fn portal_approve(
        &mut self,
        customer: &EntityId,
        quote: &EntityId,
        today: NaiveDate,
    ) -> Result<Quote> {
        self.portal_quote(customer, quote)?;
        self.approve_quote(quote, "portal", today)
    }

    pub fn portal_reject(
        &mut self,
        customer: &EntityId,
        quote: &EntityId,
        reason: Option<String>,
    ) -> Result<Quote> {
        self.portal_quote(customer, quote)?;
        self.reject_quote(quote, "portal", reason)
    }

    // ----- dashboard -----

    pub fn dashboard(&self, today: NaiveDate) -> Result<Dashboard> {
        let quotes = self.quotes.list()?;
        let pending: Vec<&Quote> = quotes
            .iter()
            .filter(|q| q.status == QuoteStatus::Pending)
            .collect();

        let orders = self.orders.list()?;
        let orders_by_status = OrderStatus::all()
            .iter()
            .map(|s| {
                (
                    s.to_string(),
                    orders.iter().filter(|o| o.status == *s).count(),
                )
            })
            .filter(|(_, n)| *n > 0)
            .collect();

        let sales_today: Vec<Sale> = self
            .sales
            .list()?
            .into_iter()
            .filter(|s| {
                s.status == SaleStatus::Completed
                    && s.created.with_timezone(&chrono::Local).date_naive() == today
            })
            .collect();

        Ok(Dashboard {
            customers: self.customers.list()?.iter().filter(|c| c.active).count(),
            vehicles: self.vehicles.list()?.len(),
            active_employees: self.employees.list()?.iter().filter(|e| e.active).count(),
            pending_quotes: pending.len(),
            pending_quote_value: pending
                .iter()
                .map(|q| self.document_totals(&q.items).net_total)
                .sum(),
            orders_by_status,
            appointments_today: self
                .appointments_on(today)?
                .iter()
                .filter(|a| a.status.blocks_slot())
                .count(),
            sales_today: sales_today.len(),
            sales_today_total: sales_today.iter().map(|s| s.totals().net_total).sum(),
            low_stock_parts: self
                .parts
                .list()?
                .iter()
                .filter(|p| p.active && p.is_low_stock())
                .count(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::Role;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 4, 10).unwrap()
    }

    struct Fixture {
        shop: Shop,
        customer: Customer,
        vehicle: Vehicle,
        mechanic: Employee,
        pad: PartItem,
    }

    fn fixture() -> Fixture {
        let mut shop = Shop::in_memory(ShopSettings::default());
        let customer = shop
            .register_customer(Customer::new(
                "Maria Souza".to_string(),
                "123.456.789-09".to_string(),
                "11987654321".to_string(),
                "t".to_string(),
            ))
            .unwrap();
        let vehicle = shop
            .register_vehicle(Vehicle::new(
                customer.id.clone(),
                "ABC-1D23",
                "Fiat".to_string(),
                "Uno".to_string(),
                2015,
                "t".to_string(),
            ))
            .unwrap();
        let mechanic = shop
            .register_employee(Employee::new(
                "Carlos Pereira".to_string(),
                Role::Mechanic,
                "98765432100".to_string(),
                "11912345678".to_string(),
                "t".to_string(),
            ))
            .unwrap();
        let mut pad = PartItem::new("PF-100".to_string(), "Pastilha".to_string(), 45.0, "t".to_string());
        pad.stock = 10;
        let pad = shop.add_part_item(pad).unwrap();
        shop.add_service_item(ServiceItem::new("Alinhamento".to_string(), 150.0, "t".to_string()))
            .unwrap();

        Fixture {
            shop,
            customer,
            vehicle,
            mechanic,
            pad,
        }
    }

    fn reference_draft(f: &Fixture) -> DocumentDraft {
        let mut items = LineItems::new();
        items
            .add_service(f.shop.service_line_from_catalog("alinhamento", None).unwrap())
            .unwrap();
        items
            .add_service(ServiceInput {
                description: "Balanceamento".to_string(),
                value: 120.0,
                ..Default::default()
            })
            .unwrap();
        items
            .add_part(f.shop.part_line_from_catalog("PF-100", 4, None).unwrap())
            .unwrap();
        items
            .add_part(PartInput {
                name: "Fluido de freio".to_string(),
                quantity: 1,
                unit_price: 35.0,
                ..Default::default()
            })
            .unwrap();
        items.set_discount(20.0).unwrap();

        DocumentDraft {
            customer: Some(f.customer.id.clone()),
            vehicle: Some(f.vehicle.id.clone()),
            items,
            ..Default::default()
        }
    }

    #[test]
    fn test_quote_totals_and_numbering() {
        let mut f = fixture();
        let draft = reference_draft(&f);
        let quote = f.shop.create_quote(draft.clone(), today()).unwrap();

        let totals = f.shop.document_totals(&quote.items);
        assert_eq!(totals.service_subtotal, 270.0);
        assert_eq!(totals.part_subtotal, 215.0);
        assert_eq!(totals.gross_total, 485.0);
        assert_eq!(totals.net_total, 465.0);
        assert_eq!(quote.number, 1);
        assert_eq!(quote.valid_until, NaiveDate::from_ymd_opt(2026, 4, 25).unwrap());

        let second = f.shop.create_quote(draft, today()).unwrap();
        assert_eq!(second.number, 2);
    }

    #[test]
    fn test_empty_quote_rejected() {
        let mut f = fixture();
        let draft = DocumentDraft {
            customer: Some(f.customer.id.clone()),
            vehicle: Some(f.vehicle.id.clone()),
            ..Default::default()
        };
        let err = f.shop.create_quote(draft, today()).unwrap_err();
        assert!(err.to_string().contains("Add at least one service or part"));
    }

    #[test]
    fn test_removing_last_line_is_refused() {
        let mut f = fixture();
        let mut draft = reference_draft(&f);
        draft.items = LineItems::new();
        draft
            .items
            .add_service(ServiceInput {
                description: "Diagnóstico".to_string(),
                value: 90.0,
                ..Default::default()
            })
            .unwrap();
        let quote = f.shop.create_quote(draft, today()).unwrap();

        let err = f
            .shop
            .edit_quote(&quote.id, |items| {
                items.remove_line(1);
                Ok(())
            })
            .unwrap_err();
        assert!(matches!(err, ShopError::Validation(_)));

        let stored = f.shop.quotes.find_by_id(&quote.id).unwrap().unwrap();
        assert_eq!(stored.items.line_count(), 1);
    }

    #[test]
    fn test_vehicle_must_belong_to_customer() {
        let mut f = fixture();
        let other = f
            .shop
            .register_customer(Customer::new(
                "Joao Lima".to_string(),
                "11122233344".to_string(),
                "1134567890".to_string(),
                "t".to_string(),
            ))
            .unwrap();
        let mut draft = reference_draft(&f);
        draft.customer = Some(other.id);

        let err = f.shop.create_quote(draft, today()).unwrap_err();
        assert!(matches!(err, ShopError::Conflict(_)));
    }

    #[test]
    fn test_approve_convert_flow() {
        let mut f = fixture();
        let quote = f.shop.create_quote(reference_draft(&f), today()).unwrap();

        assert!(f.shop.convert_quote(&quote.id).is_err());

        f.shop.approve_quote(&quote.id, "ana", today()).unwrap();
        let (quote, order) = f.shop.convert_quote(&quote.id).unwrap();

        assert_eq!(quote.status, QuoteStatus::ConvertedToOrder);
        assert_eq!(quote.work_order.as_ref(), Some(&order.id));
        assert_eq!(order.quote.as_ref(), Some(&quote.id));
        assert_eq!(order.items, quote.items);
        assert_eq!(order.number, 1);

        assert!(f.shop.edit_quote(&quote.id, |_| Ok(())).is_err());
    }

    #[test]
    fn test_expired_quote_needs_renewal() {
        let mut f = fixture();
        let quote = f.shop.create_quote(reference_draft(&f), today()).unwrap();
        let later = today() + Duration::days(30);

        let err = f.shop.approve_quote(&quote.id, "ana", later).unwrap_err();
        assert!(matches!(err, ShopError::Workflow(WorkflowError::Expired(_))));

        f.shop.renew_quote(&quote.id, later).unwrap();
        assert!(f.shop.approve_quote(&quote.id, "ana", later).is_ok());
    }

    #[test]
    fn test_rejected_quote_can_be_renewed() {
        let mut f = fixture();
        let quote = f.shop.create_quote(reference_draft(&f), today()).unwrap();
        f.shop
            .reject_quote(&quote.id, "ana", Some("caro".to_string()))
            .unwrap();

        let renewed = f.shop.renew_quote(&quote.id, today()).unwrap();
        assert_eq!(renewed.status, QuoteStatus::Pending);
        assert!(renewed.rejection_reason.is_none());
    }

    #[test]
    fn test_order_status_stamps_times() {
        let mut f = fixture();
        let order = f.shop.create_order(reference_draft(&f)).unwrap();
        let now = Utc::now();

        let order = f.shop.transition_order(&order.id, OrderStatus::InProgress, now).unwrap();
        assert_eq!(order.started_at, Some(now));

        assert!(f
            .shop
            .transition_order(&order.id, OrderStatus::Delivered, now)
            .is_err());

        let order = f.shop.transition_order(&order.id, OrderStatus::Completed, now).unwrap();
        assert_eq!(order.completed_at, Some(now));
        assert!(f.shop.edit_order(&order.id, |_| Ok(())).is_err());
    }

    #[test]
    fn test_assign_requires_active_mechanic() {
        let mut f = fixture();
        let order = f.shop.create_order(reference_draft(&f)).unwrap();

        let order = f.shop.assign_mechanic(&order.id, &f.mechanic.id).unwrap();
        assert_eq!(order.mechanic.as_ref(), Some(&f.mechanic.id));

        f.shop.deactivate_employee(&f.mechanic.id).unwrap();
        let err = f.shop.assign_mechanic(&order.id, &f.mechanic.id).unwrap_err();
        assert!(matches!(err, ShopError::Conflict(_)));
    }

    #[test]
    fn test_sale_clamps_and_moves_stock() {
        let mut f = fixture();
        let sale = f
            .shop
            .create_sale(SaleDraft {
                lines: vec![SaleLine {
                    part: "pf-100".to_string(),
                    quantity: 1,
                }],
                discount: 80.0,
                payment: PaymentMethod::Pix,
                ..Default::default()
            })
            .unwrap();

        assert_eq!(sale.totals().gross_total, 45.0);
        assert_eq!(sale.totals().net_total, 0.0);
        assert_eq!(f.shop.find_part("PF-100").unwrap().unwrap().stock, 9);

        f.shop.cancel_sale(&sale.id, Utc::now()).unwrap();
        assert_eq!(f.shop.find_part("PF-100").unwrap().unwrap().stock, 10);
        assert!(f.shop.cancel_sale(&sale.id, Utc::now()).is_err());
    }

    #[test]
    fn test_sale_stock_shortage() {
        let mut f = fixture();
        let err = f
            .shop
            .create_sale(SaleDraft {
                lines: vec![
                    SaleLine {
                        part: f.pad.id.to_string(),
                        quantity: 6,
                    },
                    SaleLine {
                        part: "PF-100".to_string(),
                        quantity: 5,
                    },
                ],
                ..Default::default()
            })
            .unwrap_err();
        assert!(matches!(
            err,
            ShopError::InsufficientStock {
                available: 10,
                requested: 11,
                ..
            }
        ));
        assert_eq!(f.shop.find_part("PF-100").unwrap().unwrap().stock, 10);
    }

    #[test]
    fn test_saving_edited_quote_keeps_workflow() {
        let mut f = fixture();
        let quote = f.shop.create_quote(reference_draft(&f), today()).unwrap();

        let mut edited = quote.clone();
        edited.status = QuoteStatus::Approved;
        let err = f.shop.save_quote(edited).unwrap_err();
        assert!(matches!(err, ShopError::Conflict(_)));
        let stored = f.shop.quotes.find_by_id(&quote.id).unwrap().unwrap();
        assert_eq!(stored.status, QuoteStatus::Pending);
        assert!(stored.decided_at.is_none());

        let mut edited = quote.clone();
        edited.valid_until = today() + Duration::days(365);
        edited.decided_by = Some("ana".to_string());
        edited.notes = Some("trocar também o fluido".to_string());
        let saved = f.shop.save_quote(edited).unwrap();
        assert_eq!(saved.valid_until, quote.valid_until);
        assert!(saved.decided_by.is_none());
        assert_eq!(saved.notes.as_deref(), Some("trocar também o fluido"));

        let later = today() + Duration::days(30);
        let err = f.shop.approve_quote(&quote.id, "ana", later).unwrap_err();
        assert!(matches!(err, ShopError::Workflow(WorkflowError::Expired(_))));
    }

    #[test]
    fn test_saving_edited_quote_checks_vehicle_owner() {
        let mut f = fixture();
        let quote = f.shop.create_quote(reference_draft(&f), today()).unwrap();
        let other = f
            .shop
            .register_customer(Customer::new(
                "Joao Lima".to_string(),
                "11122233344".to_string(),
                "1134567890".to_string(),
                "t".to_string(),
            ))
            .unwrap();
        let other_car = f
            .shop
            .register_vehicle(Vehicle::new(
                other.id.clone(),
                "XYZ9A87",
                "Ford".to_string(),
                "Ka".to_string(),
                2019,
                "t".to_string(),
            ))
            .unwrap();

        let mut edited = quote.clone();
        edited.vehicle = other_car.id.clone();
        assert!(matches!(f.shop.save_quote(edited).unwrap_err(), ShopError::Conflict(_)));

        let mut edited = quote;
        edited.customer = other.id;
        edited.vehicle = other_car.id;
        assert!(f.shop.save_quote(edited).is_ok());
    }

    #[test]
    fn test_saving_edited_order_keeps_workflow() {
        let mut f = fixture();
        let order = f.shop.create_order(reference_draft(&f)).unwrap();

        let mut edited = order.clone();
        edited.status = OrderStatus::InProgress;
        assert!(matches!(f.shop.save_order(edited).unwrap_err(), ShopError::Conflict(_)));

        let mut edited = order.clone();
        edited.started_at = Some(Utc::now());
        edited.complaint = Some("Ruído ao frear".to_string());
        let saved = f.shop.save_order(edited).unwrap();
        assert!(saved.started_at.is_none());
        assert_eq!(saved.complaint.as_deref(), Some("Ruído ao frear"));

        let started = f
            .shop
            .transition_order(&order.id, OrderStatus::InProgress, Utc::now())
            .unwrap();
        assert!(started.started_at.is_some());

        f.shop.deactivate_employee(&f.mechanic.id).unwrap();
        let mut edited = started;
        edited.mechanic = Some(f.mechanic.id.clone());
        assert!(matches!(f.shop.save_order(edited).unwrap_err(), ShopError::Conflict(_)));
    }

    #[test]
    fn test_sale_quantity_overflow_rejected() {
        let mut f = fixture();
        let err = f
            .shop
            .create_sale(SaleDraft {
                lines: vec![
                    SaleLine {
                        part: "PF-100".to_string(),
                        quantity: i64::from(u32::MAX),
                    },
                    SaleLine {
                        part: "PF-100".to_string(),
                        quantity: 2,
                    },
                ],
                payment: PaymentMethod::Pix,
                ..Default::default()
            })
            .unwrap_err();
        assert!(matches!(err, ShopError::Validation(_)));
        assert_eq!(f.shop.find_part("PF-100").unwrap().unwrap().stock, 10);
        assert!(f.shop.sales.list().unwrap().is_empty());
    }

    #[test]
    fn test_cancel_sale_refuses_stock_overflow() {
        let mut f = fixture();
        let sale = f
            .shop
            .create_sale(SaleDraft {
                lines: vec![SaleLine {
                    part: "PF-100".to_string(),
                    quantity: 2,
                }],
                payment: PaymentMethod::Pix,
                ..Default::default()
            })
            .unwrap();

        let mut pad = f.shop.find_part("PF-100").unwrap().unwrap();
        pad.stock = u32::MAX - 1;
        f.shop.update_part_item(pad).unwrap();

        let err = f.shop.cancel_sale(&sale.id, Utc::now()).unwrap_err();
        assert!(matches!(err, ShopError::Conflict(_)));
        assert_eq!(f.shop.find_part("PF-100").unwrap().unwrap().stock, u32::MAX - 1);
        let stored = f.shop.sales.find_by_id(&sale.id).unwrap().unwrap();
        assert_eq!(stored.status, SaleStatus::Completed);
    }

    #[test]
    fn test_inspection_rejects_unknown_items() {
        use crate::entities::{AnswerValue, ChecklistItem};

        let mut f = fixture();
        let template = f
            .shop
            .create_template(ChecklistTemplate::new(
                "Entrada".to_string(),
                vec![ChecklistItem::parse_spec(1, "yes_no:Luzes funcionando:required").unwrap()],
                "t".to_string(),
            ))
            .unwrap();

        let mut inspection = Inspection::new(&template, f.vehicle.id.clone(), "t".to_string());
        inspection.set_answer(1, AnswerValue::YesNo(true));
        inspection.set_answer(7, AnswerValue::Text("pneu careca".to_string()));
        match f.shop.record_inspection(inspection.clone()).unwrap_err() {
            ShopError::Validation(errors) => assert!(errors.has("answers[7]")),
            other => panic!("unexpected error: {other}"),
        }
        assert!(f.shop.inspections.list().unwrap().is_empty());

        inspection.answers.retain(|a| a.item == 1);
        assert!(f.shop.record_inspection(inspection).is_ok());
    }

    #[test]
    fn test_sale_quantity_zero_rejected() {
        let mut f = fixture();
        let err = f
            .shop
            .create_sale(SaleDraft {
                lines: vec![SaleLine {
                    part: "PF-100".to_string(),
                    quantity: 0,
                }],
                ..Default::default()
            })
            .unwrap_err();
        match err {
            ShopError::Validation(errors) => assert!(errors.has("items[0].quantity")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_schedule_conflicts() {
        let mut f = fixture();
        let start = today().and_hms_opt(9, 0, 0).unwrap();
        let draft = AppointmentDraft {
            customer: f.customer.id.clone(),
            vehicle: f.vehicle.id.clone(),
            mechanic: Some(f.mechanic.id.clone()),
            starts_at: start,
            duration_minutes: 60,
            service: "Revisão".to_string(),
            notes: None,
        };
        let first = f.shop.schedule(draft.clone()).unwrap();

        let mut overlapping = draft.clone();
        overlapping.starts_at = start + Duration::minutes(30);
        assert!(matches!(
            f.shop.schedule(overlapping.clone()),
            Err(ShopError::Conflict(_))
        ));

        f.shop
            .transition_appointment(&first.id, AppointmentStatus::Cancelled)
            .unwrap();
        assert!(f.shop.schedule(overlapping).is_ok());
        assert_eq!(f.shop.appointments_on(today()).unwrap().len(), 2);
    }

    #[test]
    fn test_delete_guarded_by_references() {
        let mut f = fixture();
        let err = f.shop.delete(&f.customer.id).unwrap_err();
        assert!(err.to_string().contains("deactivate it instead"));

        f.shop.delete(&f.vehicle.id).unwrap();
        f.shop.delete(&f.customer.id).unwrap();
        assert!(f.shop.find_customer("12345678909").unwrap().is_none());
    }

    #[test]
    fn test_lookups() {
        let f = fixture();
        assert!(f.shop.find_customer("123.456.789-09").unwrap().is_some());
        assert!(f.shop.find_vehicle("abc1d23").unwrap().is_some());
        assert!(f.shop.find_vehicle("ZZZ9Z99").unwrap().is_none());
        assert!(f.shop.find_service("ALINHAMENTO").unwrap().is_some());

        let matches = f.shop.search_catalog("pasti").unwrap();
        assert_eq!(matches.parts.len(), 1);
        assert!(matches.services.is_empty());
    }

    #[test]
    fn test_portal_only_shows_own_records() {
        let mut f = fixture();
        let quote = f.shop.create_quote(reference_draft(&f), today()).unwrap();
        let other = f
            .shop
            .register_customer(Customer::new(
                "Joao Lima".to_string(),
                "11122233344".to_string(),
                "1134567890".to_string(),
                "t".to_string(),
            ))
            .unwrap();

        let view = f.shop.portal(&f.customer.id, today()).unwrap();
        assert_eq!(view.quotes.len(), 1);
        assert_eq!(view.quotes[0].1.net_total, 465.0);

        assert!(matches!(
            f.shop.portal_approve(&other.id, &quote.id, today()),
            Err(ShopError::NotFound { .. })
        ));
        let approved = f.shop.portal_approve(&f.customer.id, &quote.id, today()).unwrap();
        assert_eq!(approved.decided_by.as_deref(), Some("portal"));
    }

    #[test]
    fn test_dashboard_counts() {
        let mut f = fixture();
        f.shop.create_quote(reference_draft(&f), today()).unwrap();
        f.shop.create_order(reference_draft(&f)).unwrap();

        let dash = f.shop.dashboard(today()).unwrap();
        assert_eq!(dash.customers, 1);
        assert_eq!(dash.pending_quotes, 1);
        assert_eq!(dash.pending_quote_value, 465.0);
        assert_eq!(dash.orders_by_status, vec![("open".to_string(), 1)]);
    }

    #[test]
    fn test_uniform_clamp_setting() {
        let mut f = fixture();
        f.shop.settings.document_policy = DiscountPolicy::ClampAtZero;
        let mut items = LineItems::new();
        items
            .add_part(f.shop.part_line_from_catalog("PF-100", 1, Some(50.0)).unwrap())
            .unwrap();
        items.set_discount(80.0).unwrap();
        assert_eq!(f.shop.document_totals(&items).net_total, 0.0);
    }

    #[test]
    fn test_updates_revalidate() {
        let mut f = fixture();

        let mut vehicle = f.vehicle.clone();
        vehicle.mileage = Some(81_000);
        f.shop.update_vehicle(vehicle).unwrap();
        let stored = f.shop.require_vehicle("ABC1D23").unwrap();
        assert_eq!(stored.mileage, Some(81_000));

        let mut vehicle = stored;
        vehicle.plate = "AB1".to_string();
        assert!(f.shop.update_vehicle(vehicle).is_err());

        let mut mechanic = f.mechanic.clone();
        mechanic.name = "Carlos A. Pereira".to_string();
        f.shop.update_employee(mechanic).unwrap();
        let stored = f.shop.require_employee(&f.mechanic.id.to_string()).unwrap();
        assert_eq!(stored.name, "Carlos A. Pereira");
        assert!(f.shop.find_employee("FUN-NOPE").unwrap().is_none());

        let mut service = f.shop.find_service("alinhamento").unwrap().unwrap();
        service.price = 165.0;
        f.shop.update_service_item(service).unwrap();
        let line = f.shop.service_line_from_catalog("alinhamento", None).unwrap();
        assert_eq!(line.value, 165.0);
    }

    #[test]
    fn test_yaml_backed_shop_persists() {
        let tmp = tempfile::tempdir().unwrap();
        let project = Project::init(tmp.path()).unwrap();

        let id = {
            let mut shop = Shop::open(&project, ShopSettings::default());
            shop.register_customer(Customer::new(
                "Maria Souza".to_string(),
                "12345678909".to_string(),
                "11987654321".to_string(),
                "t".to_string(),
            ))
            .unwrap()
            .id
        };

        let shop = Shop::open(&project, ShopSettings::default());
        let found = shop.require_customer(&id.to_string()).unwrap();
        assert_eq!(found.name, "Maria Souza");
        assert!(project.entity_path(&id).exists());
    }
}
