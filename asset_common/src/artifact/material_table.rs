use super::{split_numbered_line, FormatError};

/// Materials of one model, in material index order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModelMaterials {
    pub model_name: String,
    /// Empty when the material has no diffuse texture.
    pub diffuse_textures: Vec<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MaterialTable {
    pub models: Vec<ModelMaterials>,
}

impl MaterialTable {
    pub fn parse(text: &str) -> Result<Self, FormatError> {
        let mut models = Vec::new();
        let mut lines = text.lines().enumerate().map(|(i, line)| (i + 1, line));

        while let Some((line_number, line)) = lines.next() {
            if line.trim().is_empty() {
                continue;
            }
            let (model_name, [material_count]) = split_numbered_line::<1>(line, line_number)?;
            let mut diffuse_textures = Vec::with_capacity(material_count as usize);
            for _ in 0..material_count {
                match lines.next() {
                    Some((_, texture)) => diffuse_textures.push(texture.to_string()),
                    None => {
                        return Err(FormatError::EntryCount {
                            expected: material_count,
                            found: diffuse_textures.len() as u64,
                        })
                    }
                }
            }
            models.push(ModelMaterials {
                model_name: model_name.to_string(),
                diffuse_textures,
            });
        }

        Ok(Self { models })
    }

    pub fn get(&self, model_name: &str) -> Option<&ModelMaterials> {
        self.models.iter().find(|m| m.model_name == model_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_texture_lines_are_kept() {
        let table = MaterialTable::parse("chair 2\nwood.png\n\nlamp 1\nglass.png\n").unwrap();
        assert_eq!(table.models.len(), 2);
        assert_eq!(
            table.get("chair").unwrap().diffuse_textures,
            vec!["wood.png".to_string(), String::new()]
        );
        assert_eq!(table.get("lamp").unwrap().diffuse_textures, vec!["glass.png"]);
    }

    #[test]
    fn missing_material_lines_are_an_error() {
        assert_eq!(
            MaterialTable::parse("chair 3\nwood.png\n"),
            Err(FormatError::EntryCount {
                expected: 3,
                found: 1
            })
        );
    }
}
