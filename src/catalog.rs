//! Static service catalogs.
//!
//! Prices are whole Kenyan shillings. A service with `min_price` is
//! variable-priced: its `price` is the floor and a customer may quote any
//! custom price at or above it.

use serde::Serialize;
use utoipa::ToSchema;

use crate::types::CatalogKind;

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CatalogService {
    #[schema(value_type = String)]
    pub id: &'static str,
    #[schema(value_type = String)]
    pub name: &'static str,
    #[schema(value_type = String)]
    pub description: &'static str,
    pub price: i64,
    pub min_price: Option<i64>,
    #[schema(value_type = String)]
    pub estimated_time: &'static str,
    #[schema(value_type = Vec<String>)]
    pub features: &'static [&'static str],
}

impl CatalogService {
    pub fn is_variable_price(&self) -> bool {
        self.min_price.is_some()
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CatalogCategory {
    #[schema(value_type = String)]
    pub id: &'static str,
    #[schema(value_type = String)]
    pub name: &'static str,
    #[schema(value_type = Vec<CatalogService>)]
    pub services: &'static [CatalogService],
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Catalog {
    pub kind: CatalogKind,
    #[schema(value_type = String)]
    pub title: &'static str,
    #[schema(value_type = Vec<CatalogCategory>)]
    pub categories: &'static [CatalogCategory],
}

impl Catalog {
    pub fn find(&self, service_id: &str) -> Option<&'static CatalogService> {
        self.categories
            .iter()
            .flat_map(|c| c.services.iter())
            .find(|s| s.id == service_id)
    }

    pub fn services(&self) -> impl Iterator<Item = &'static CatalogService> + '_ {
        self.categories.iter().flat_map(|c| c.services.iter())
    }
}

const fn fixed(
    id: &'static str,
    name: &'static str,
    description: &'static str,
    price: i64,
    estimated_time: &'static str,
    features: &'static [&'static str],
) -> CatalogService {
    CatalogService {
        id,
        name,
        description,
        price,
        min_price: None,
        estimated_time,
        features,
    }
}

const fn variable(
    id: &'static str,
    name: &'static str,
    description: &'static str,
    min_price: i64,
    estimated_time: &'static str,
    features: &'static [&'static str],
) -> CatalogService {
    CatalogService {
        id,
        name,
        description,
        price: min_price,
        min_price: Some(min_price),
        estimated_time,
        features,
    }
}

static BUSINESS: Catalog = Catalog {
    kind: CatalogKind::Business,
    title: "Business Services",
    categories: &[
        CatalogCategory {
            id: "registration",
            name: "Business Registration",
            services: &[
                fixed(
                    "business-name-registration",
                    "Business Name Registration",
                    "Name search, reservation and registration of a sole proprietorship.",
                    3_500,
                    "3-5 business days",
                    &["Name search", "Name reservation", "Certificate of registration"],
                ),
                fixed(
                    "private-limited-company",
                    "Private Limited Company",
                    "Incorporation of a limited company including CR12.",
                    25_000,
                    "7-14 business days",
                    &["Name reservation", "Memorandum & articles", "Certificate of incorporation", "CR12"],
                ),
                fixed(
                    "partnership-registration",
                    "Partnership Registration",
                    "Registration of a general partnership with partnership deed review.",
                    8_000,
                    "5-7 business days",
                    &["Name search", "Partnership deed review", "Certificate of registration"],
                ),
                variable(
                    "ngo-registration",
                    "NGO Registration",
                    "Registration with the NGO Coordination Board; priced on organisation size.",
                    50_000,
                    "30-60 business days",
                    &["Constitution drafting", "Board filings", "Certificate of registration"],
                ),
            ],
        },
        CatalogCategory {
            id: "tax",
            name: "KRA & Tax Services",
            services: &[
                fixed(
                    "kra-pin-registration",
                    "KRA PIN Registration",
                    "Individual or company KRA PIN registration on iTax.",
                    1_500,
                    "1-2 business days",
                    &["iTax account setup", "PIN certificate"],
                ),
                fixed(
                    "tax-returns-filing",
                    "Tax Returns Filing",
                    "Annual income tax return preparation and filing.",
                    3_000,
                    "1-3 business days",
                    &["Return preparation", "iTax filing", "Acknowledgement receipt"],
                ),
                fixed(
                    "tax-compliance-certificate",
                    "Tax Compliance Certificate",
                    "Application and follow-up for a KRA tax compliance certificate.",
                    2_500,
                    "2-5 business days",
                    &["Compliance check", "Certificate application"],
                ),
                fixed(
                    "vat-registration",
                    "VAT Registration",
                    "VAT obligation registration for businesses above the threshold.",
                    5_000,
                    "3-5 business days",
                    &["Obligation registration", "First return guidance"],
                ),
            ],
        },
        CatalogCategory {
            id: "compliance",
            name: "Compliance",
            services: &[
                fixed(
                    "annual-returns",
                    "Annual Returns Filing",
                    "Filing of company annual returns with the registrar.",
                    5_000,
                    "3-5 business days",
                    &["Returns preparation", "Registrar filing"],
                ),
                fixed(
                    "cr12-search",
                    "CR12 Search",
                    "Official search of company directors and shareholders.",
                    3_000,
                    "1-2 business days",
                    &["Official search", "CR12 document"],
                ),
                variable(
                    "business-permit",
                    "Single Business Permit",
                    "County business permit application; priced per county tariff.",
                    10_000,
                    "5-10 business days",
                    &["County application", "Permit collection"],
                ),
            ],
        },
    ],
};

static DATA: Catalog = Catalog {
    kind: CatalogKind::Data,
    title: "Data & Analytics",
    categories: &[
        CatalogCategory {
            id: "analysis",
            name: "Data Analysis",
            services: &[
                fixed(
                    "data-cleaning",
                    "Data Cleaning",
                    "De-duplication, validation and normalisation of datasets.",
                    15_000,
                    "3-7 business days",
                    &["Data audit", "Cleaning scripts", "Quality report"],
                ),
                fixed(
                    "survey-analysis",
                    "Survey Analysis",
                    "Statistical analysis and reporting of survey results.",
                    20_000,
                    "5-10 business days",
                    &["Descriptive statistics", "Cross tabulation", "Written report"],
                ),
                variable(
                    "predictive-analytics",
                    "Predictive Analytics",
                    "Forecasting and predictive models scoped to the dataset.",
                    80_000,
                    "2-6 weeks",
                    &["Model development", "Validation", "Deployment guide"],
                ),
            ],
        },
        CatalogCategory {
            id: "visualization",
            name: "Visualization",
            services: &[
                variable(
                    "dashboard-development",
                    "Dashboard Development",
                    "Interactive business dashboards in Power BI or Metabase.",
                    50_000,
                    "2-4 weeks",
                    &["KPI design", "Interactive dashboard", "Training session"],
                ),
                fixed(
                    "data-entry",
                    "Data Entry",
                    "Digitisation of paper records into structured formats.",
                    5_000,
                    "1-5 business days",
                    &["Double-entry verification", "Excel or CSV delivery"],
                ),
            ],
        },
    ],
};

static WEBSITE: Catalog = Catalog {
    kind: CatalogKind::Website,
    title: "Website Development",
    categories: &[
        CatalogCategory {
            id: "build",
            name: "Website Builds",
            services: &[
                fixed(
                    "landing-page",
                    "Landing Page",
                    "Single-page responsive site with contact form.",
                    25_000,
                    "1-2 weeks",
                    &["Responsive design", "Contact form", "Basic SEO"],
                ),
                fixed(
                    "business-website",
                    "Business Website",
                    "Up to eight pages with CMS and analytics.",
                    60_000,
                    "3-4 weeks",
                    &["Up to 8 pages", "CMS", "Google Analytics"],
                ),
                variable(
                    "ecommerce-website",
                    "E-commerce Website",
                    "Online store with M-Pesa checkout; priced on catalogue size.",
                    120_000,
                    "4-8 weeks",
                    &["Product catalogue", "M-Pesa checkout", "Order management"],
                ),
            ],
        },
        CatalogCategory {
            id: "care",
            name: "Care & Growth",
            services: &[
                fixed(
                    "website-maintenance",
                    "Website Maintenance",
                    "Monthly updates, backups and uptime monitoring.",
                    5_000,
                    "Monthly",
                    &["Backups", "Security updates", "Uptime monitoring"],
                ),
                fixed(
                    "seo-optimization",
                    "SEO Optimization",
                    "On-page SEO audit and improvements.",
                    15_000,
                    "1-2 weeks",
                    &["Keyword research", "On-page fixes", "Search console setup"],
                ),
                fixed(
                    "domain-hosting",
                    "Domain & Hosting",
                    "Annual .co.ke domain and shared hosting.",
                    4_000,
                    "1 business day",
                    &[".co.ke domain", "Shared hosting", "SSL certificate"],
                ),
            ],
        },
    ],
};

pub fn catalog(kind: CatalogKind) -> &'static Catalog {
    match kind {
        CatalogKind::Business => &BUSINESS,
        CatalogKind::Data => &DATA,
        CatalogKind::Website => &WEBSITE,
    }
}

pub fn all_catalogs() -> [&'static Catalog; 3] {
    [&BUSINESS, &DATA, &WEBSITE]
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn service_ids_are_unique_per_catalog() {
        for catalog in all_catalogs() {
            let mut seen = HashSet::new();
            for service in catalog.services() {
                assert!(seen.insert(service.id), "duplicate id {}", service.id);
            }
        }
    }

    #[test]
    fn variable_services_price_at_their_floor() {
        for catalog in all_catalogs() {
            for service in catalog.services() {
                assert!(service.price > 0, "{} has no price", service.id);
                if let Some(min) = service.min_price {
                    assert_eq!(service.price, min);
                }
            }
        }
    }

    #[test]
    fn lookup_by_id() {
        let business = catalog(CatalogKind::Business);
        let pin = business.find("kra-pin-registration").expect("kra pin service");
        assert_eq!(pin.name, "KRA PIN Registration");
        assert_eq!(pin.price, 1_500);
        assert!(!pin.is_variable_price());
        let ngo = business.find("ngo-registration").expect("ngo service");
        assert_eq!(ngo.min_price, Some(50_000));
        assert!(business.find("landing-page").is_none());
    }
}
