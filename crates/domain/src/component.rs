//! Controlled components and a per-component container.

use std::fmt;

use serde::{Deserialize, Serialize};

/// One of the physical switches the controller drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Component {
    /// Circulation pump; serves both the tank→room and heater→tank circuits.
    Pump,
    /// Water-heating element charging the tank.
    Heater,
    /// Air fan moving heat from the floor towards the desk.
    Fan,
}

impl Component {
    /// Every component, in the order they are reconciled.
    pub const ALL: [Self; 3] = [Self::Pump, Self::Heater, Self::Fan];

    /// Lowercase name, as used in metric names and config keys.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pump => "pump",
            Self::Heater => "heater",
            Self::Fan => "fan",
        }
    }
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One value per [`Component`], addressed through named fields or
/// [`get`](Self::get)/[`get_mut`](Self::get_mut).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerComponent<T> {
    pub pump: T,
    pub heater: T,
    pub fan: T,
}

impl<T> PerComponent<T> {
    /// Build a container by calling `f` for every component.
    pub fn from_fn(mut f: impl FnMut(Component) -> T) -> Self {
        Self {
            pump: f(Component::Pump),
            heater: f(Component::Heater),
            fan: f(Component::Fan),
        }
    }

    #[must_use]
    pub fn get(&self, component: Component) -> &T {
        match component {
            Component::Pump => &self.pump,
            Component::Heater => &self.heater,
            Component::Fan => &self.fan,
        }
    }

    pub fn get_mut(&mut self, component: Component) -> &mut T {
        match component {
            Component::Pump => &mut self.pump,
            Component::Heater => &mut self.heater,
            Component::Fan => &mut self.fan,
        }
    }

    /// Iterate `(component, value)` pairs in [`Component::ALL`] order.
    pub fn iter(&self) -> impl Iterator<Item = (Component, &T)> {
        Component::ALL.into_iter().map(move |c| (c, self.get(c)))
    }

    /// Transform every value, keeping the component association.
    pub fn map<U>(self, mut f: impl FnMut(Component, T) -> U) -> PerComponent<U> {
        PerComponent {
            pump: f(Component::Pump, self.pump),
            heater: f(Component::Heater, self.heater),
            fan: f(Component::Fan, self.fan),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_display_lowercase_names() {
        assert_eq!(Component::Pump.to_string(), "pump");
        assert_eq!(Component::Heater.to_string(), "heater");
        assert_eq!(Component::Fan.to_string(), "fan");
    }

    #[test]
    fn should_address_fields_by_component() {
        let mut values = PerComponent::from_fn(|c| c.as_str().len());
        assert_eq!(*values.get(Component::Pump), 4);
        assert_eq!(*values.get(Component::Heater), 6);
        *values.get_mut(Component::Fan) = 99;
        assert_eq!(values.fan, 99);
    }

    #[test]
    fn should_iterate_in_reconcile_order() {
        let values = PerComponent::from_fn(|c| c);
        let order: Vec<Component> = values.iter().map(|(c, _)| c).collect();
        assert_eq!(order, Component::ALL.to_vec());
    }

    #[test]
    fn should_map_values() {
        let values = PerComponent::from_fn(|_| 2).map(|_, v| v * 10);
        assert_eq!(values, PerComponent { pump: 20, heater: 20, fan: 20 });
    }

    #[test]
    fn should_deserialize_per_component_from_json() {
        let parsed: PerComponent<u32> =
            serde_json::from_str(r#"{"pump": 1, "heater": 2, "fan": 3}"#).unwrap();
        assert_eq!(parsed.heater, 2);
    }
}
