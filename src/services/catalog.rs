// ============================================================================
// CATALOGUE ET TARIFS
// ============================================================================
//
// Description:
//   Tables statiques de packs de crédits, taux de taxe et prix par défaut
//   des webinaires. Montants en dinars (3 décimales, stockés en millimes).
//
// Règles de prix:
//   - MASTER_CLASS : prix HT (webinaire ou défaut) x (1 + TVA), taxable
//   - PHARMIA : prix HT (webinaire ou défaut) x (1 + TVA), taxable
//   - autres groupes (CROP Tunis...) : prix du webinaire ou forfait, non taxable
//   - packs : toujours HT x (1 + TVA), taxables
//   - droit de timbre ajouté UNE fois si au moins une ligne est taxable
//
// ============================================================================

use rust_decimal::Decimal;

use crate::models::enums::WebinarGroup;
use crate::models::webinars;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackCatalog {
    /// Crédits Master Class (users.master_class_credits)
    MasterClass,
    /// Crédits plateforme (users.pharmia_credits)
    Pharmia,
}

#[derive(Debug)]
pub struct Pack {
    pub id: &'static str,
    pub name: &'static str,
    pub credits: i32,
    price_ht_millimes: i64,
}

impl Pack {
    pub fn price_ht(&self) -> Decimal {
        Decimal::new(self.price_ht_millimes, 3)
    }
}

pub struct TaxRates {
    vat_percent: i64,
    stamp_duty_millimes: i64,
}

impl TaxRates {
    pub fn vat(&self) -> Decimal {
        Decimal::new(self.vat_percent, 2)
    }

    pub fn stamp_duty(&self) -> Decimal {
        Decimal::new(self.stamp_duty_millimes, 3)
    }
}

pub const TAX_RATES: TaxRates = TaxRates {
    vat_percent: 19,
    stamp_duty_millimes: 1_000,
};

pub const MASTER_CLASS_PACKS: &[Pack] = &[
    Pack { id: "MC_UNIT", name: "Master Class - 1 séance", credits: 1, price_ht_millimes: 80_000 },
    Pack { id: "MC_PACK_3", name: "Master Class - 3 séances", credits: 3, price_ht_millimes: 220_000 },
    Pack { id: "MC_PACK_6", name: "Master Class - 6 séances", credits: 6, price_ht_millimes: 420_000 },
];

pub const PHARMIA_CREDIT_PACKS: &[Pack] = &[
    Pack { id: "PHARMIA_5", name: "PharmIA - 5 crédits", credits: 5, price_ht_millimes: 25_000 },
    Pack { id: "PHARMIA_10", name: "PharmIA - 10 crédits", credits: 10, price_ht_millimes: 50_000 },
    Pack { id: "PHARMIA_25", name: "PharmIA - 25 crédits", credits: 25, price_ht_millimes: 110_000 },
];

const MASTER_CLASS_DEFAULT_PRICE_HT_MILLIMES: i64 = 80_000;
const PHARMIA_WEBINAR_DEFAULT_PRICE_HT_MILLIMES: i64 = 30_000;
const CROP_TUNIS_DEFAULT_PRICE_MILLIMES: i64 = 80_000;

pub fn master_class_default_price_ht() -> Decimal {
    Decimal::new(MASTER_CLASS_DEFAULT_PRICE_HT_MILLIMES, 3)
}

pub fn pharmia_webinar_default_price_ht() -> Decimal {
    Decimal::new(PHARMIA_WEBINAR_DEFAULT_PRICE_HT_MILLIMES, 3)
}

pub fn crop_tunis_default_price() -> Decimal {
    Decimal::new(CROP_TUNIS_DEFAULT_PRICE_MILLIMES, 3)
}

/// Cherche un pack dans les deux catalogues
pub fn find_pack(id: &str) -> Option<(PackCatalog, &'static Pack)> {
    MASTER_CLASS_PACKS
        .iter()
        .find(|pack| pack.id == id)
        .map(|pack| (PackCatalog::MasterClass, pack))
        .or_else(|| {
            PHARMIA_CREDIT_PACKS
                .iter()
                .find(|pack| pack.id == id)
                .map(|pack| (PackCatalog::Pharmia, pack))
        })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PricedLine {
    pub price: Decimal,
    pub tax_applicable: bool,
}

fn with_vat(price_ht: Decimal) -> Decimal {
    (price_ht * (Decimal::ONE + TAX_RATES.vat())).round_dp(3)
}

pub fn price_webinar(webinar: &webinars::Model) -> PricedLine {
    match webinar.group {
        WebinarGroup::MasterClass => PricedLine {
            price: with_vat(webinar.price.unwrap_or_else(master_class_default_price_ht)),
            tax_applicable: true,
        },
        WebinarGroup::Pharmia => PricedLine {
            price: with_vat(webinar.price.unwrap_or_else(pharmia_webinar_default_price_ht)),
            tax_applicable: true,
        },
        WebinarGroup::CropTunis => PricedLine {
            price: webinar.price.unwrap_or_else(crop_tunis_default_price),
            tax_applicable: false,
        },
    }
}

pub fn price_pack(pack: &Pack) -> PricedLine {
    PricedLine {
        price: with_vat(pack.price_ht()),
        tax_applicable: true,
    }
}

/// Total de la commande : somme des lignes + un seul droit de timbre si
/// au moins une ligne est taxable
pub fn order_total(lines: &[PricedLine]) -> Decimal {
    let subtotal: Decimal = lines.iter().map(|line| line.price).sum();

    if lines.iter().any(|line| line.tax_applicable) {
        subtotal + TAX_RATES.stamp_duty()
    } else {
        subtotal
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn webinar(group: WebinarGroup, price: Option<Decimal>) -> webinars::Model {
        webinars::Model {
            id: 1,
            title: "Séance".to_string(),
            description: String::new(),
            group,
            master_class_theme: None,
            date: Utc::now(),
            price,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_master_class_price_includes_vat_and_stamp_duty() {
        let line = price_webinar(&webinar(WebinarGroup::MasterClass, Some(Decimal::new(100, 0))));

        assert_eq!(line.price, Decimal::new(119_000, 3));
        assert!(line.tax_applicable);
        assert_eq!(order_total(&[line]), Decimal::new(120_000, 3));
    }

    #[test]
    fn test_crop_tunis_flat_price_has_no_stamp_duty() {
        let line = price_webinar(&webinar(WebinarGroup::CropTunis, None));

        assert_eq!(line.price, Decimal::new(80_000, 3));
        assert!(!line.tax_applicable);
        assert_eq!(order_total(&[line]), Decimal::new(80_000, 3));
    }

    #[test]
    fn test_default_prices_apply_when_webinar_has_none() {
        let master_class = price_webinar(&webinar(WebinarGroup::MasterClass, None));
        assert_eq!(master_class.price, with_vat(master_class_default_price_ht()));

        let pharmia = price_webinar(&webinar(WebinarGroup::Pharmia, None));
        assert_eq!(pharmia.price, Decimal::new(35_700, 3));
        assert!(pharmia.tax_applicable);
    }

    #[test]
    fn test_stamp_duty_added_once_for_many_taxed_lines() {
        let (_, pack) = find_pack("PHARMIA_10").unwrap();
        let lines = [
            price_pack(pack),
            price_pack(pack),
            price_webinar(&webinar(WebinarGroup::CropTunis, Some(Decimal::new(40, 0)))),
        ];

        // 2 x 59.500 + 40 + 1.000
        assert_eq!(order_total(&lines), Decimal::new(160_000, 3));
    }

    #[test]
    fn test_find_pack_in_both_catalogs() {
        assert_eq!(find_pack("MC_PACK_3").map(|(c, p)| (c, p.credits)), Some((PackCatalog::MasterClass, 3)));
        assert_eq!(find_pack("PHARMIA_25").map(|(c, p)| (c, p.credits)), Some((PackCatalog::Pharmia, 25)));
        assert!(find_pack("UNKNOWN").is_none());
    }

    #[test]
    fn test_free_webinar_totals_zero() {
        let line = price_webinar(&webinar(WebinarGroup::CropTunis, Some(Decimal::ZERO)));
        assert_eq!(order_total(&[line]), Decimal::ZERO);
    }
}
