// Flight offer normalization: raw search-result offers into deal records
use crate::windows::DateWindow;
use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

// Cabin assumed when an offer carries no fare details
pub const DEFAULT_BOOKING_CLASS: &str = "ECONOMY";

const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum MalformedOfferError {
    #[error("Offer has no price total")]
    MissingPrice,

    #[error("Invalid price total: {0}")]
    InvalidPrice(String),

    #[error("Offer has no currency")]
    MissingCurrency,

    #[error("Offer has no outbound itinerary")]
    MissingOutbound,

    #[error("Outbound itinerary has no segments")]
    EmptyOutbound,

    #[error("Segment is missing field: {0}")]
    MissingSegmentField(&'static str),

    #[error("Invalid segment timestamp: {0}")]
    InvalidTimestamp(String),
}

// Data structures for the search API's offer records. Every field is optional
// so one incomplete offer never fails decoding of the whole response.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RawOffer {
    pub id: Option<String>,
    pub price: Option<RawPrice>,
    pub itineraries: Vec<RawItinerary>,
    pub traveler_pricings: Vec<RawTravelerPricing>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RawPrice {
    pub total: Option<String>,
    pub currency: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RawItinerary {
    pub segments: Vec<RawSegment>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RawSegment {
    pub departure: Option<RawEndpoint>,
    pub arrival: Option<RawEndpoint>,
    pub carrier_code: Option<String>,
    pub number: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RawEndpoint {
    pub iata_code: Option<String>,
    pub at: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RawTravelerPricing {
    pub fare_details_by_segment: Vec<RawFareDetail>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RawFareDetail {
    pub cabin: Option<String>,
}

impl RawOffer {
    // Total price as a decimal; used for threshold filtering before full parsing
    pub fn total_price(&self) -> Result<Decimal, MalformedOfferError> {
        let total = self
            .price
            .as_ref()
            .and_then(|p| p.total.as_deref())
            .ok_or(MalformedOfferError::MissingPrice)?;

        Decimal::from_str(total.trim())
            .map_err(|_| MalformedOfferError::InvalidPrice(total.to_string()))
    }

    pub fn currency(&self) -> Option<&str> {
        self.price.as_ref().and_then(|p| p.currency.as_deref())
    }

    fn booking_class(&self) -> Option<&str> {
        self.traveler_pricings
            .first()
            .and_then(|tp| tp.fare_details_by_segment.first())
            .and_then(|fd| fd.cabin.as_deref())
    }
}

// Normalized data
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub from_code: String,
    pub to_code: String,
    // Airport-local times as reported by the API
    pub departure_at: NaiveDateTime,
    pub arrival_at: NaiveDateTime,
    pub carrier_code: String,
    pub flight_number: String,
}

impl Segment {
    pub fn flight_designator(&self) -> String {
        format!("{}{}", self.carrier_code, self.flight_number)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FlightDeal {
    pub destination: String,
    pub window: DateWindow,
    pub price: Decimal,
    pub currency: String,
    pub outbound_segments: Vec<Segment>,
    pub inbound_segments: Vec<Segment>,
    pub booking_class: String,
}

impl FlightDeal {
    pub fn is_one_way(&self) -> bool {
        self.inbound_segments.is_empty()
    }
}

fn parse_timestamp(raw: &str) -> Result<NaiveDateTime, MalformedOfferError> {
    NaiveDateTime::parse_from_str(raw, TIMESTAMP_FORMAT)
        .map_err(|_| MalformedOfferError::InvalidTimestamp(raw.to_string()))
}

fn required<'a>(
    value: Option<&'a str>,
    field: &'static str,
) -> Result<&'a str, MalformedOfferError> {
    value
        .filter(|v| !v.is_empty())
        .ok_or(MalformedOfferError::MissingSegmentField(field))
}

// Map one raw segment; applied identically to outbound and inbound legs
pub fn parse_segment(raw: &RawSegment) -> Result<Segment, MalformedOfferError> {
    let departure = raw
        .departure
        .as_ref()
        .ok_or(MalformedOfferError::MissingSegmentField("departure"))?;
    let arrival = raw
        .arrival
        .as_ref()
        .ok_or(MalformedOfferError::MissingSegmentField("arrival"))?;

    Ok(Segment {
        from_code: required(departure.iata_code.as_deref(), "departure.iataCode")?.to_string(),
        to_code: required(arrival.iata_code.as_deref(), "arrival.iataCode")?.to_string(),
        departure_at: parse_timestamp(required(departure.at.as_deref(), "departure.at")?)?,
        arrival_at: parse_timestamp(required(arrival.at.as_deref(), "arrival.at")?)?,
        carrier_code: required(raw.carrier_code.as_deref(), "carrierCode")?.to_string(),
        flight_number: required(raw.number.as_deref(), "number")?.to_string(),
    })
}

fn parse_itinerary(itinerary: &RawItinerary) -> Result<Vec<Segment>, MalformedOfferError> {
    itinerary.segments.iter().map(parse_segment).collect()
}

#[derive(Debug, Default, Clone, Copy)]
pub struct OfferParser;

impl OfferParser {
    pub fn new() -> Self {
        Self
    }

    pub fn parse(
        &self,
        raw: &RawOffer,
        destination: &str,
        window: DateWindow,
    ) -> Result<FlightDeal, MalformedOfferError> {
        let price = raw.total_price()?;
        let currency = raw
            .currency()
            .filter(|c| !c.is_empty())
            .ok_or(MalformedOfferError::MissingCurrency)?;

        let outbound = raw
            .itineraries
            .first()
            .ok_or(MalformedOfferError::MissingOutbound)?;
        if outbound.segments.is_empty() {
            return Err(MalformedOfferError::EmptyOutbound);
        }

        let outbound_segments = parse_itinerary(outbound)?;
        let inbound_segments = match raw.itineraries.get(1) {
            Some(inbound) => parse_itinerary(inbound)?,
            None => Vec::new(),
        };

        Ok(FlightDeal {
            destination: destination.to_string(),
            window,
            price,
            currency: currency.to_string(),
            outbound_segments,
            inbound_segments,
            booking_class: raw
                .booking_class()
                .unwrap_or(DEFAULT_BOOKING_CLASS)
                .to_string(),
        })
    }
}

// Offer with one outbound segment YYZ->{dest} and optional inbound, for tests
#[cfg(test)]
pub(crate) fn sample_offer(dest: &str, total: &str, with_inbound: bool) -> RawOffer {
    let segment = |from: &str, to: &str, dep: &str, arr: &str, carrier: &str, number: &str| {
        RawSegment {
            departure: Some(RawEndpoint {
                iata_code: Some(from.to_string()),
                at: Some(dep.to_string()),
            }),
            arrival: Some(RawEndpoint {
                iata_code: Some(to.to_string()),
                at: Some(arr.to_string()),
            }),
            carrier_code: Some(carrier.to_string()),
            number: Some(number.to_string()),
        }
    };

    let mut itineraries = vec![RawItinerary {
        segments: vec![segment(
            "YYZ",
            dest,
            "2026-10-16T18:30:00",
            "2026-10-17T08:15:00",
            "AC",
            "878",
        )],
    }];
    if with_inbound {
        itineraries.push(RawItinerary {
            segments: vec![segment(
                dest,
                "YYZ",
                "2026-10-19T10:05:00",
                "2026-10-19T13:15:00",
                "AC",
                "879",
            )],
        });
    }

    RawOffer {
        id: Some("1".to_string()),
        price: Some(RawPrice {
            total: Some(total.to_string()),
            currency: Some("CAD".to_string()),
        }),
        itineraries,
        traveler_pricings: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn window() -> DateWindow {
        DateWindow::starting(NaiveDate::from_ymd_opt(2026, 10, 16).unwrap())
    }

    const AMADEUS_OFFER_JSON: &str = r#"{
        "type": "flight-offer",
        "id": "7",
        "source": "GDS",
        "itineraries": [
            {
                "duration": "PT11H5M",
                "segments": [
                    {
                        "departure": {
                            "iataCode": "YYZ", "terminal": "1", "at": "2026-10-16T17:10:00"
                        },
                        "arrival": {
                            "iataCode": "FRA", "terminal": "1", "at": "2026-10-17T06:40:00"
                        },
                        "carrierCode": "LH",
                        "number": "471",
                        "numberOfStops": 0
                    },
                    {
                        "departure": { "iataCode": "FRA", "at": "2026-10-17T08:20:00" },
                        "arrival": { "iataCode": "PRG", "at": "2026-10-17T09:15:00" },
                        "carrierCode": "LH",
                        "number": "1396"
                    }
                ]
            },
            {
                "duration": "PT10H",
                "segments": [
                    {
                        "departure": { "iataCode": "PRG", "at": "2026-10-19T10:00:00" },
                        "arrival": { "iataCode": "YYZ", "at": "2026-10-19T14:00:00" },
                        "carrierCode": "OK",
                        "number": "100"
                    }
                ]
            }
        ],
        "price": { "currency": "CAD", "total": "389.42", "base": "120.00", "grandTotal": "389.42" },
        "travelerPricings": [
            {
                "travelerId": "1",
                "fareDetailsBySegment": [
                    { "segmentId": "1", "cabin": "PREMIUM_ECONOMY" },
                    { "segmentId": "2", "cabin": "PREMIUM_ECONOMY" }
                ]
            }
        ]
    }"#;

    #[test]
    fn test_parse_amadeus_offer() {
        let raw: RawOffer = serde_json::from_str(AMADEUS_OFFER_JSON).unwrap();
        let deal = OfferParser::new().parse(&raw, "PRG", window()).unwrap();

        assert_eq!(deal.destination, "PRG");
        assert_eq!(deal.price, Decimal::from_str("389.42").unwrap());
        assert_eq!(deal.currency, "CAD");
        assert_eq!(deal.booking_class, "PREMIUM_ECONOMY");

        let route: Vec<(&str, &str)> = deal
            .outbound_segments
            .iter()
            .map(|s| (s.from_code.as_str(), s.to_code.as_str()))
            .collect();
        assert_eq!(route, vec![("YYZ", "FRA"), ("FRA", "PRG")]);
        assert_eq!(deal.outbound_segments[1].flight_designator(), "LH1396");

        assert_eq!(deal.inbound_segments.len(), 1);
        assert_eq!(deal.inbound_segments[0].flight_designator(), "OK100");
        assert_eq!(
            deal.inbound_segments[0].departure_at,
            NaiveDate::from_ymd_opt(2026, 10, 19)
                .unwrap()
                .and_hms_opt(10, 0, 0)
                .unwrap()
        );
    }

    #[test]
    fn test_one_way_offer_has_no_inbound() {
        let raw = sample_offer("ZRH", "450.00", false);
        let deal = OfferParser::new().parse(&raw, "ZRH", window()).unwrap();

        assert!(deal.is_one_way());
        assert!(deal.inbound_segments.is_empty());
        assert_eq!(deal.outbound_segments.len(), 1);
    }

    #[test]
    fn test_inbound_matches_second_itinerary() {
        let raw = sample_offer("ZRH", "450.00", true);
        let deal = OfferParser::new().parse(&raw, "ZRH", window()).unwrap();

        let expected = parse_segment(&raw.itineraries[1].segments[0]).unwrap();
        assert_eq!(deal.inbound_segments, vec![expected]);
    }

    #[test]
    fn test_booking_class_defaults_to_economy() {
        let mut raw = sample_offer("AMS", "300", false);
        let deal = OfferParser::new().parse(&raw, "AMS", window()).unwrap();
        assert_eq!(deal.booking_class, DEFAULT_BOOKING_CLASS);

        // Traveler pricing present but without fare details
        raw.traveler_pricings.push(RawTravelerPricing::default());
        let deal = OfferParser::new().parse(&raw, "AMS", window()).unwrap();
        assert_eq!(deal.booking_class, "ECONOMY");
    }

    #[test]
    fn test_booking_class_is_kept_verbatim() {
        let mut raw = sample_offer("AMS", "300", false);
        raw.traveler_pricings.push(RawTravelerPricing {
            fare_details_by_segment: vec![RawFareDetail {
                cabin: Some("business".to_string()),
            }],
        });

        let deal = OfferParser::new().parse(&raw, "AMS", window()).unwrap();
        assert_eq!(deal.booking_class, "business");
    }

    #[test]
    fn test_missing_price_is_malformed() {
        let mut raw = sample_offer("AMS", "300", false);
        raw.price = None;
        assert_eq!(
            OfferParser::new().parse(&raw, "AMS", window()),
            Err(MalformedOfferError::MissingPrice)
        );
    }

    #[test]
    fn test_unparseable_price_is_malformed() {
        let raw = sample_offer("AMS", "cheap", false);
        assert_eq!(
            raw.total_price(),
            Err(MalformedOfferError::InvalidPrice("cheap".to_string()))
        );
    }

    #[test]
    fn test_missing_currency_is_malformed() {
        let mut raw = sample_offer("AMS", "300", false);
        if let Some(price) = raw.price.as_mut() {
            price.currency = None;
        }
        assert_eq!(
            OfferParser::new().parse(&raw, "AMS", window()),
            Err(MalformedOfferError::MissingCurrency)
        );
    }

    #[test]
    fn test_missing_outbound_is_malformed() {
        let mut raw = sample_offer("AMS", "300", false);
        raw.itineraries.clear();
        assert_eq!(
            OfferParser::new().parse(&raw, "AMS", window()),
            Err(MalformedOfferError::MissingOutbound)
        );

        raw.itineraries.push(RawItinerary::default());
        assert_eq!(
            OfferParser::new().parse(&raw, "AMS", window()),
            Err(MalformedOfferError::EmptyOutbound)
        );
    }

    #[test]
    fn test_segment_missing_fields() {
        let mut raw = sample_offer("AMS", "300", false);
        raw.itineraries[0].segments[0].number = None;
        assert_eq!(
            OfferParser::new().parse(&raw, "AMS", window()),
            Err(MalformedOfferError::MissingSegmentField("number"))
        );

        let mut raw = sample_offer("AMS", "300", false);
        if let Some(departure) = raw.itineraries[0].segments[0].departure.as_mut() {
            departure.at = Some("16/10/2026 18:30".to_string());
        }
        assert_eq!(
            OfferParser::new().parse(&raw, "AMS", window()),
            Err(MalformedOfferError::InvalidTimestamp("16/10/2026 18:30".to_string()))
        );
    }

    #[test]
    fn test_decoding_tolerates_sparse_offer() {
        let raw: RawOffer = serde_json::from_str(r#"{"id": "3"}"#).unwrap();
        assert!(raw.itineraries.is_empty());
        assert_eq!(raw.total_price(), Err(MalformedOfferError::MissingPrice));
    }
}
