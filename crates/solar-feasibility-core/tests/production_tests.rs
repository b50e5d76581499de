use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use solar_feasibility_core::production::solar_metrics::{
    calculate_solar_metrics, BuildingProfile, EnergyData, SiteAddress, SolarMetricsInput,
    SolarSystemSpecs,
};

fn office(building_area_m2: Option<Decimal>) -> SolarMetricsInput {
    SolarMetricsInput {
        building: BuildingProfile {
            name: "Riverside Offices".into(),
            roof_area_m2: dec!(500),
            building_area_m2,
            panel_capacity_watts: dec!(400),
            address: SiteAddress {
                city: "Austin".into(),
                state: "TX".into(),
                county: Some("Travis County".into()),
            },
            industry: Some("Office".into()),
        },
        energy: EnergyData {
            electricity_rate: dec!(0.13),
            consumption_benchmark: dec!(1.2),
            sun_hours_per_day: dec!(5.3),
        },
        specs: SolarSystemSpecs::default(),
    }
}

#[test]
fn test_roof_bounded_tall_building() {
    // Five floors of 500 m2 need more panels than the roof holds
    let out = calculate_solar_metrics(&office(Some(dec!(2_500)))).unwrap();
    let r = &out.result;

    // 500 m2 = 5 382 sq ft; 70% usable = 3 767.4; / 17.6 = 214 panels
    assert_eq!(r.usable_rooftop_area_sq_ft, dec!(3_767.4));
    assert_eq!(r.number_of_solar_panels, 214);
    assert_eq!(r.system_capacity_kw, dec!(85.6));
    assert!(r.energy_offset_percentage < dec!(100));
    assert!(out.warnings.iter().any(|w| w.contains("Roof space limits")));
    assert_eq!(r.details.industry, "Office");
    assert_eq!(r.details.address, "Austin, TX");
}

#[test]
fn test_building_area_fallback() {
    let with_area = calculate_solar_metrics(&office(Some(dec!(1_000))))
        .unwrap()
        .result;
    let without_area = calculate_solar_metrics(&office(None)).unwrap().result;
    // Fallback is twice the roof area, i.e. 1 000 m2 here
    assert_eq!(
        with_area.facility_monthly_consumption_kwh,
        without_area.facility_monthly_consumption_kwh
    );
}

#[test]
fn test_cost_includes_demand_uplift() {
    let r = calculate_solar_metrics(&office(None)).unwrap().result;
    assert_eq!(
        r.monthly_electricity_cost,
        r.facility_monthly_consumption_kwh * dec!(0.13) * dec!(1.2)
    );
    assert_eq!(r.installation_cost, r.system_capacity_kw * dec!(2_850));
}

#[test]
fn test_payback_month_is_within_twenty_years_when_present() {
    let r = calculate_solar_metrics(&office(None)).unwrap().result;
    if let Some(month) = r.roi_months {
        assert!((1..=240).contains(&month));
    }
}
