//! Equipment types and the tests each one requires

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::entities::test_table::TestKind;

/// Diagnostic X-ray equipment covered by AERB QA protocols
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum EquipmentType {
    RadiographyFixed,
    RadiographyMobile,
    Fluoroscopy,
    CArm,
    OArm,
    InterventionalRadiology,
    Mammography,
    Ct,
    Obi,
    DentalIntraoral,
    DentalOpg,
    Cbct,
    BoneDensitometry,
}

impl EquipmentType {
    /// Tests the AERB protocol expects in a report for this equipment
    pub fn required_tests(&self) -> &'static [TestKind] {
        use TestKind::*;
        match self {
            EquipmentType::RadiographyFixed | EquipmentType::RadiographyMobile | EquipmentType::Obi => &[
                OperatingPotential,
                TimerAccuracy,
                OutputReproducibility,
                Linearity,
                HalfValueLayer,
                RadiationLeakage,
            ],
            EquipmentType::Fluoroscopy
            | EquipmentType::CArm
            | EquipmentType::OArm
            | EquipmentType::InterventionalRadiology => &[
                OperatingPotential,
                OutputReproducibility,
                Linearity,
                HalfValueLayer,
                ContrastResolution,
                RadiationLeakage,
            ],
            EquipmentType::Mammography => &[
                OperatingPotential,
                OutputReproducibility,
                Linearity,
                HalfValueLayer,
                RadiationLeakage,
            ],
            EquipmentType::Ct => &[
                OperatingPotential,
                TimerAccuracy,
                OutputReproducibility,
                CtNumberAccuracy,
                ContrastResolution,
                RadiationLeakage,
            ],
            EquipmentType::DentalIntraoral | EquipmentType::DentalOpg | EquipmentType::Cbct => &[
                OperatingPotential,
                TimerAccuracy,
                OutputReproducibility,
                RadiationLeakage,
            ],
            EquipmentType::BoneDensitometry => &[
                OperatingPotential,
                OutputReproducibility,
                RadiationLeakage,
            ],
        }
    }

    /// Biplane systems carry a frontal and a lateral tube
    pub fn supports_double_tube(&self) -> bool {
        matches!(self, EquipmentType::InterventionalRadiology)
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            EquipmentType::RadiographyFixed => "Radiography (Fixed)",
            EquipmentType::RadiographyMobile => "Radiography (Mobile)",
            EquipmentType::Fluoroscopy => "Radiography and Fluoroscopy",
            EquipmentType::CArm => "C-Arm",
            EquipmentType::OArm => "O-Arm",
            EquipmentType::InterventionalRadiology => "Interventional Radiology",
            EquipmentType::Mammography => "Mammography",
            EquipmentType::Ct => "Computed Tomography",
            EquipmentType::Obi => "On-Board Imaging",
            EquipmentType::DentalIntraoral => "Dental (Intra-oral)",
            EquipmentType::DentalOpg => "Dental (OPG)",
            EquipmentType::Cbct => "Dental CBCT",
            EquipmentType::BoneDensitometry => "Bone Densitometer",
        }
    }
}

impl std::fmt::Display for EquipmentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Tube position on double-tube equipment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Tube {
    Frontal,
    Lateral,
}

impl std::fmt::Display for Tube {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Tube::Frontal => write!(f, "frontal"),
            Tube::Lateral => write!(f, "lateral"),
        }
    }
}

/// Identification of the unit under test
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EquipmentInfo {
    #[serde(rename = "type")]
    pub equipment_type: EquipmentType,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub make: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub serial_number: Option<String>,

    /// Room or department
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,

    /// Two tubes are installed (biplane)
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub double_tube: bool,
}

impl EquipmentInfo {
    pub fn new(equipment_type: EquipmentType) -> Self {
        Self {
            equipment_type,
            make: None,
            model: None,
            serial_number: None,
            location: None,
            double_tube: false,
        }
    }

    /// Tube labels tables are expected for: none for single-tube units
    pub fn tubes(&self) -> Vec<Option<Tube>> {
        if self.double_tube {
            vec![Some(Tube::Frontal), Some(Tube::Lateral)]
        } else {
            vec![None]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_type_requires_leakage_and_kvp() {
        for equipment in EquipmentType::value_variants() {
            let tests = equipment.required_tests();
            assert!(tests.contains(&TestKind::RadiationLeakage), "{}", equipment);
            assert!(tests.contains(&TestKind::OperatingPotential), "{}", equipment);
        }
    }

    #[test]
    fn test_ct_requires_ct_number() {
        assert!(EquipmentType::Ct
            .required_tests()
            .contains(&TestKind::CtNumberAccuracy));
        assert!(!EquipmentType::Mammography
            .required_tests()
            .contains(&TestKind::CtNumberAccuracy));
    }

    #[test]
    fn test_equipment_type_serializes_snake_case() {
        let yaml = serde_yml::to_string(&EquipmentType::InterventionalRadiology).unwrap();
        assert!(yaml.contains("interventional_radiology"));
    }

    #[test]
    fn test_tubes() {
        let mut info = EquipmentInfo::new(EquipmentType::InterventionalRadiology);
        assert_eq!(info.tubes(), vec![None]);
        info.double_tube = true;
        assert_eq!(info.tubes(), vec![Some(Tube::Frontal), Some(Tube::Lateral)]);
    }
}
