//! Line-item arguments shared by `quote` and `order`

use miette::Result;
use tabled::{builder::Builder, settings::Style};

use crate::core::money::{format_brl, parse_price_arg};
use crate::core::Shop;
use crate::entities::{LineItems, PartInput, ServiceInput};

#[derive(clap::Args, Debug)]
pub struct AddServiceArgs {
    /// Quote or work order (ID, short ID or number)
    pub document: String,

    /// Catalog service (code, name or ID)
    #[arg(long, short = 's', required_unless_present = "description", conflicts_with = "description")]
    pub service: Option<String>,

    /// Free-text service not in the catalog
    #[arg(long, short = 'd', requires = "value")]
    pub description: Option<String>,

    /// Labor value (defaults to the catalog price)
    #[arg(long, value_parser = parse_price_arg)]
    pub value: Option<f64>,
}

#[derive(clap::Args, Debug)]
pub struct AddPartArgs {
    /// Quote or work order (ID, short ID or number)
    pub document: String,

    /// Catalog part (code or ID)
    #[arg(long, short = 'p', required_unless_present = "name", conflicts_with = "name")]
    pub part: Option<String>,

    /// Part not in the catalog
    #[arg(long, short = 'n', requires = "price")]
    pub name: Option<String>,

    /// Quantity
    #[arg(long, default_value_t = 1, allow_negative_numbers = true)]
    pub qty: i64,

    /// Unit price (defaults to the catalog price)
    #[arg(long, value_parser = parse_price_arg)]
    pub price: Option<f64>,
}

#[derive(clap::Args, Debug)]
pub struct RemoveArgs {
    /// Quote or work order (ID, short ID or number)
    pub document: String,

    /// Line number as shown by `show`
    pub line: u32,
}

#[derive(clap::Args, Debug)]
pub struct DiscountArgs {
    /// Quote or work order (ID, short ID or number)
    pub document: String,

    /// Flat discount in reais (0 removes it)
    #[arg(value_parser = parse_price_arg)]
    pub amount: f64,
}

/// Line options accepted when a quote or work order is created
#[derive(clap::Args, Debug, Default)]
pub struct LineOpts {
    /// Catalog service, optionally with a value: `SVC` or `SVC=180`
    #[arg(long = "service", short = 's')]
    pub services: Vec<String>,

    /// Service outside the catalog: `"Description=150"`
    #[arg(long = "labor")]
    pub labor: Vec<String>,

    /// Catalog part with quantity: `PF-100` or `PF-100:2`
    #[arg(long = "part", short = 'p')]
    pub parts: Vec<String>,

    /// Flat discount in reais
    #[arg(long, value_parser = parse_price_arg)]
    pub discount: Option<f64>,
}

impl LineOpts {
    /// Build the document body, pricing catalog lines from the catalog
    pub fn build(&self, shop: &Shop) -> Result<LineItems> {
        let mut items = LineItems::new();

        for spec in &self.services {
            let (reference, value) = match spec.rsplit_once('=') {
                Some((r, v)) => (r.trim(), Some(parse_price_arg(v).map_err(|e| miette::miette!("{}", e))?)),
                None => (spec.trim(), None),
            };
            items.add_service(shop.service_line_from_catalog(reference, value)?)?;
        }

        for spec in &self.labor {
            let (description, value) = spec.rsplit_once('=').ok_or_else(|| {
                miette::miette!("--labor expects \"Description=value\", got '{}'", spec)
            })?;
            items.add_service(ServiceInput {
                catalog: None,
                description: description.to_string(),
                value: parse_price_arg(value).map_err(|e| miette::miette!("{}", e))?,
            })?;
        }

        for spec in &self.parts {
            let (reference, quantity) = parse_part_spec(spec)?;
            items.add_part(shop.part_line_from_catalog(reference, quantity, None)?)?;
        }

        if let Some(discount) = self.discount {
            items.set_discount(discount)?;
        }
        Ok(items)
    }
}

/// `CODE` or `CODE:QTY`; zero and negative quantities are left to validation
pub fn parse_part_spec(spec: &str) -> Result<(&str, i64)> {
    match spec.rsplit_once(':') {
        Some((code, qty)) => {
            let qty = qty
                .trim()
                .parse::<i64>()
                .map_err(|_| miette::miette!("'{}' is not a quantity in '{}'", qty, spec))?;
            Ok((code.trim(), qty))
        }
        None => Ok((spec.trim(), 1)),
    }
}

pub fn service_input(shop: &Shop, args: &AddServiceArgs) -> Result<ServiceInput> {
    match (&args.service, &args.description) {
        (Some(reference), _) => Ok(shop.service_line_from_catalog(reference, args.value)?),
        (None, Some(description)) => Ok(ServiceInput {
            catalog: None,
            description: description.clone(),
            value: args.value.unwrap_or_default(),
        }),
        (None, None) => Err(miette::miette!("give --service or --description")),
    }
}

pub fn part_input(shop: &Shop, args: &AddPartArgs) -> Result<PartInput> {
    match (&args.part, &args.name) {
        (Some(reference), _) => Ok(shop.part_line_from_catalog(reference, args.qty, args.price)?),
        (None, Some(name)) => Ok(PartInput {
            catalog: None,
            code: None,
            name: name.clone(),
            quantity: args.qty,
            unit_price: args.price.unwrap_or_default(),
        }),
        (None, None) => Err(miette::miette!("give --part or --name")),
    }
}

/// Line table for the `show` views
pub fn print_items(items: &LineItems) {
    if items.is_empty() {
        println!("(no lines)");
        return;
    }

    let mut builder = Builder::default();
    builder.push_record(["#", "Kind", "Description", "Qty", "Unit", "Total"]);
    for s in &items.services {
        builder.push_record([
            s.id.to_string(),
            "service".to_string(),
            s.description.clone(),
            "1".to_string(),
            format_brl(s.value),
            format_brl(s.value),
        ]);
    }
    for p in &items.parts {
        let name = match &p.code {
            Some(code) => format!("{} ({})", p.name, code),
            None => p.name.clone(),
        };
        builder.push_record([
            p.id.to_string(),
            "part".to_string(),
            name,
            p.quantity.to_string(),
            format_brl(p.unit_price),
            format_brl(p.line_total()),
        ]);
    }
    println!("{}", builder.build().with(Style::rounded()));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ShopSettings;
    use crate::entities::{PartItem, ServiceItem};

    fn shop() -> Shop {
        let mut shop = Shop::in_memory(ShopSettings::default());
        let mut part = PartItem::new("PF-100".into(), "Pastilha".into(), 45.0, "t".into());
        part.stock = 10;
        shop.add_part_item(part).unwrap();
        let mut service = ServiceItem::new("Alinhamento".into(), 150.0, "t".into());
        service.code = Some("ALN".into());
        shop.add_service_item(service).unwrap();
        shop
    }

    #[test]
    fn test_part_spec() {
        assert_eq!(parse_part_spec("PF-100").unwrap(), ("PF-100", 1));
        assert_eq!(parse_part_spec("PF-100:3").unwrap(), ("PF-100", 3));
        assert_eq!(parse_part_spec("PF-100:0").unwrap(), ("PF-100", 0));
        assert!(parse_part_spec("PF-100:x").is_err());
    }

    #[test]
    fn test_build_prices_from_catalog() {
        let opts = LineOpts {
            services: vec!["ALN".into(), "Alinhamento=180".into()],
            labor: vec!["Troca de óleo=80,00".into()],
            parts: vec!["PF-100:2".into()],
            discount: Some(20.0),
        };
        let items = opts.build(&shop()).unwrap();

        assert_eq!(items.services[0].value, 150.0);
        assert_eq!(items.services[1].value, 180.0);
        assert_eq!(items.services[2].description, "Troca de óleo");
        assert!(items.services[2].catalog.is_none());
        assert_eq!(items.parts[0].quantity, 2);
        assert_eq!(items.parts[0].unit_price, 45.0);
        assert_eq!(items.discount, 20.0);
        assert_eq!(items.parts[0].id, 4);
    }

    #[test]
    fn test_build_rejects_zero_quantity() {
        let opts = LineOpts {
            parts: vec!["PF-100:0".into()],
            ..Default::default()
        };
        let err = opts.build(&shop()).unwrap_err();
        assert!(err.to_string().contains("quantity must be at least 1"));
    }

    #[test]
    fn test_unknown_catalog_reference() {
        let opts = LineOpts {
            services: vec!["Funilaria".into()],
            ..Default::default()
        };
        assert!(opts.build(&shop()).is_err());
    }
}
