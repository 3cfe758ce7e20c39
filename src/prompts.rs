//! Prompt and response schema for shipping-bill field extraction.
//!
//! The JSON shape described here is the contract between this crate and the
//! vision model: field names and types must match
//! [`crate::record::PartialRecord`] exactly. [`SCHEMA_VERSION`] tags that
//! contract; a response carrying a different tag is rejected.
//!
//! Callers can override the prompt via
//! [`crate::config::ExtractionConfig::system_prompt`].

/// Version tag of the extraction contract.
pub const SCHEMA_VERSION: &str = "csb-v1";

/// Default system prompt for extracting one page of a Courier Shipping Bill.
pub const EXTRACTION_PROMPT: &str = r#"You are an expert data extraction AI specializing in logistics documents. Analyze the provided image of a "Courier Shipping Bill (CSB)-V". Extract all available information based on the JSON schema below.

Pay close attention to all sections, including courier details, HAWB details, consignor/consignee information, financial values, and the item details on the second page. If a field or section is not present on the current page, omit it from the output. Some information might be split across two pages.

Respond with a single JSON object and nothing else. Include "schemaVersion": "csb-v1".

SCHEMA (all fields optional):
{
  "schemaVersion": "csb-v1",
  "csbNumber": string,                  // The CSB Number (e.g., CSBV_DEL_...)
  "fillingDate": string,                // The Filling Date (e.g., DD/MM/YYYY)
  "courierRegistrationNumber": string,  // The Courier Registration Number
  "courierName": string,                // The name of the courier (e.g., FEDEX)
  "hawbNumber": string,                 // The HAWB Number
  "numberOfPackages": integer,          // The number of packages
  "declaredWeightKg": number,           // The Declared Weight in Kgs
  "airportOfDestination": string,       // The Airport of Destination (e.g., NYC)
  "consignorName": string,              // The name of the Consignor
  "consignorAddress": string,           // The full address of the Consignor
  "consigneeName": string,              // The name of the Consignee
  "consigneeAddress": string,           // The full address of the Consignee
  "invoiceNumber": string,              // The Invoice Number from the INVOICE DETAILS section
  "invoiceDate": string,                // The Invoice Date from the INVOICE DETAILS section (e.g., DD/MM/YYYY)
  "fobValueInr": number,                // The FOB Value in INR
  "fobValueForeign": number,            // The FOB Value in Foreign Currency
  "fobCurrency": string,                // The FOB Currency (e.g., USD)
  "lineItems": [                        // All items from the ITEM DETAILS section
    {
      "description": string,            // Goods Description of the item
      "sku": string,                    // SKU NO of the item
      "ctsh": string,                   // CTSH of the item
      "quantity": integer,              // Quantity of the item
      "unitPrice": number,              // Unit Price of the item
      "unitPriceCurrency": string,      // Unit Price Currency (e.g., USD)
      "totalValue": number,             // Total Item Value
      "unitOfMeasure": string           // Unit Of Measure (e.g., UNT)
    }
  ]
}

Numbers must be plain JSON numbers without currency symbols or thousands separators."#;

/// User-turn text accompanying each page image.
pub const PAGE_INSTRUCTION: &str = "Extract the shipping bill fields visible on this page.";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_names_every_contract_field() {
        for field in [
            "csbNumber",
            "fillingDate",
            "courierRegistrationNumber",
            "courierName",
            "hawbNumber",
            "numberOfPackages",
            "declaredWeightKg",
            "airportOfDestination",
            "consignorName",
            "consignorAddress",
            "consigneeName",
            "consigneeAddress",
            "invoiceNumber",
            "invoiceDate",
            "fobValueInr",
            "fobValueForeign",
            "fobCurrency",
            "lineItems",
            "unitPriceCurrency",
            "unitOfMeasure",
        ] {
            assert!(EXTRACTION_PROMPT.contains(field), "missing {field}");
        }
    }

    #[test]
    fn prompt_carries_schema_version() {
        assert!(EXTRACTION_PROMPT.contains(SCHEMA_VERSION));
    }
}
